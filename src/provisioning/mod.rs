//! Calls into the external interconnect API that patches lab ports together.

pub mod client;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use client::InterconnectClient;
pub use types::{ProvisionRequest, ProvisionResponse};

/// Creates and clears physical links on the interconnect switches
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkProvisioner: Send + Sync {
    async fn create_link(&self, req: &ProvisionRequest) -> Result<ProvisionResponse>;

    async fn clear_link(&self, req: &ProvisionRequest) -> Result<ProvisionResponse>;
}
