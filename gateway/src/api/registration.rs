use crate::api::utils::{GatewayBody, deserialize_body, text_response};
use crate::errors::GatewayError;
use crate::metrics_defs::REGISTRATIONS;
use http::StatusCode;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};
use mappings::Registrar;
use serde::Deserialize;
use shared::counter;

/// Body of a registration request. Both fields are optional here so that a
/// missing field is reported by [`RegistrationRequest::validate`] instead of a
/// generic decode error.
#[derive(Debug, Deserialize)]
struct RegistrationRequest {
    endpoint: Option<String>,
    uri: Option<String>,
}

impl RegistrationRequest {
    fn validate(self) -> Result<(String, String), GatewayError> {
        let endpoint = self
            .endpoint
            .filter(|e| !e.is_empty())
            .ok_or_else(|| GatewayError::InvalidRegistration("missing endpoint".into()))?;
        let uri = self
            .uri
            .filter(|u| !u.is_empty())
            .ok_or_else(|| GatewayError::InvalidRegistration("missing uri".into()))?;
        Ok((endpoint, uri))
    }
}

/// Handles `{endpoint, uri}` registrations. Any failure, including an invalid
/// payload, answers with a server error and leaves every store untouched
/// unless the failure happened while writing.
pub async fn handle<B>(
    registrar: &Registrar,
    req: Request<B>,
) -> Result<Response<GatewayBody>, GatewayError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let parsed = deserialize_body::<RegistrationRequest, _>(req.into_body())
        .await
        .and_then(RegistrationRequest::validate);

    let (endpoint, uri) = match parsed {
        Ok(registration) => registration,
        Err(e) => {
            counter!(REGISTRATIONS, "outcome" => "invalid").increment(1);
            tracing::warn!(error = %e, "rejected registration");
            return text_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid registration\n");
        }
    };

    match registrar.register(&endpoint, &uri).await {
        Ok(diff) => {
            counter!(REGISTRATIONS, "outcome" => "ok").increment(1);
            tracing::info!(
                %endpoint,
                sink = %uri,
                changed = diff.upserts.len(),
                removed = diff.deletions.len(),
                "registered sink"
            );
            text_response(StatusCode::OK, "ok\n")
        }
        Err(e) => {
            counter!(REGISTRATIONS, "outcome" => "failed").increment(1);
            tracing::error!(%endpoint, sink = %uri, error = %e, "registration failed");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed\n")
        }
    }
}
