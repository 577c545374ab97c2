//! JSON body extractor with the API's validation error shape.

use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;

use crate::api::ApiError;

/// Like [`Json`], but a malformed or incomplete body is rejected with a
/// generic `400 Validation Error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ValidatedJson(value))
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))
    }
}
