use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::{error::AppError, payload::Validate};

pub mod lms;
pub mod user;

/// ValidatedJson
///
/// JSON body extractor that also runs the payload's `Validate` rules. A body that
/// fails to parse, or parses but breaks a rule, is rejected with a 400 envelope whose
/// `error` field lists every problem found.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(request, state).await?;

        let errors = payload.validate();
        if !errors.is_empty() {
            return Err(AppError::validation("invalid request body", errors));
        }
        Ok(ValidatedJson(payload))
    }
}
