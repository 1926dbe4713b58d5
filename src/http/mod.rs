mod retry;

pub use retry::{is_retryable, request_with_retry, retry_with_backoff, HasStatus, RetryPolicy};

use reqwest::Response;

use crate::RecipeError;

/// Pass a 2xx response through; turn anything else into [`RecipeError::Status`].
pub(crate) async fn ensure_success(service: &str, response: Response) -> Result<Response, RecipeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RecipeError::Status {
        service: service.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Decode a JSON body into `T`, reporting shape mismatches as invalid responses.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    service: &str,
    response: Response,
) -> Result<T, RecipeError> {
    let text = response.text().await?;
    log::debug!("{} response: {}", service, text);
    serde_json::from_str(&text).map_err(|e| RecipeError::invalid_response(service, e.to_string()))
}
