use crate::api::utils::{GatewayBody, json_response};
use crate::errors::GatewayError;
use hyper::Response;
use mappings::MappingStore;

/// Returns the whole mapping table of this process as a JSON object of path
/// to sink list, in insertion order.
pub fn handle(store: &MappingStore) -> Result<Response<GatewayBody>, GatewayError> {
    json_response(&*store.snapshot())
}
