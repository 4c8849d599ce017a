//! Cloud client trait

use crate::error::CloudError;
use crate::types::{WhoAmIRequest, WhoAmIResponse};
use async_trait::async_trait;

/// Cloud API client
///
/// Implementations must be `Send + Sync` so a single client can be shared
/// by the background tasks that poll the cloud.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Look up the user the request's token belongs to
    ///
    /// With `wait_for_registration` set, the server holds the request open
    /// until the token is registered.
    async fn whoami(&self, request: &WhoAmIRequest) -> Result<WhoAmIResponse, CloudError>;
}
