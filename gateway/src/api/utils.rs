use crate::errors::GatewayError;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, Limited};
use hyper::Response;
use hyper::body::{Body, Bytes};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub type GatewayBody = BoxBody<Bytes, GatewayError>;

/// Upper bound for JSON request bodies handled by the gateway itself.
const MAX_JSON_BODY_BYTES: usize = 64 * 1024;

/// Deserializes a JSON request body into the specified type.
pub async fn deserialize_body<T, B>(body: B) -> Result<T, GatewayError>
where
    T: DeserializeOwned,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = Limited::new(body, MAX_JSON_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| GatewayError::RequestBodyError(e.to_string()))?
        .to_bytes();
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::InvalidRegistration(e.to_string()))
}

/// Serializes a value into a JSON response.
pub fn json_response<T: Serialize>(value: &T) -> Result<Response<GatewayBody>, GatewayError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| GatewayError::InternalError(format!("Failed to serialize: {e}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)).map_err(|e| match e {}).boxed())
        .map_err(|e| GatewayError::InternalError(format!("Failed to build response: {e}")))
}

pub fn text_response(
    status: StatusCode,
    text: &'static str,
) -> Result<Response<GatewayBody>, GatewayError> {
    Response::builder()
        .status(status)
        .body(Full::new(text.into()).map_err(|e| match e {}).boxed())
        .map_err(|e| GatewayError::InternalError(format!("Failed to build response: {e}")))
}
