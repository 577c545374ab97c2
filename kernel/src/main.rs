use conservation_kernel::host::KernelState;
use conservation_kernel::infrastructure::{
    audit, config::Settings, server, telemetry::Telemetry,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new()?;

    let telemetry = Telemetry::init(&config.telemetry, env!("CARGO_PKG_VERSION"), true)?;

    info!("Conservation Kernel Starting...");
    audit::log_audit(&audit::AuditEvent::SystemStartup {
        component: "Kernel".into(),
    });

    let state = match KernelState::from_settings(&config).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to initialize kernel state: {:?}", e);
            return Err(e);
        }
    };

    let app = server::build_router(state, &config.server.base_path, telemetry.prometheus);
    let addr = config.bind_address().to_socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Conservation Kernel Initialized. Waiting for shutdown signal...");

    if let Err(e) = server::run_server(listener, app, shutdown_signal()).await {
        error!("Server failed: {:?}", e);
        return Err(e);
    }

    audit::log_audit(&audit::AuditEvent::SystemShutdown {
        reason: "Signal received".into(),
    });

    info!("Conservation Kernel Shutdown Complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, cleaning up...");
}
