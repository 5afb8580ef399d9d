//! Trait definitions for the assets module.

use async_trait::async_trait;

use super::error::AssetError;
use super::types::AssetRequest;

/// A backend that renders generated assets.
#[async_trait]
pub trait AssetGenerator: Send + Sync {
    /// Returns the name of this generator implementation.
    fn name(&self) -> &str;

    /// Renders `request.kind` to `request.destination`.
    async fn generate(&self, request: &AssetRequest) -> Result<(), AssetError>;
}
