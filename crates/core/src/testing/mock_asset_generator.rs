//! Mock asset generator for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::assets::{AssetError, AssetGenerator, AssetRequest};

/// Mock implementation of the AssetGenerator trait.
///
/// Writes a few bytes to the requested destination instead of rendering.
#[derive(Debug, Default)]
pub struct MockAssetGenerator {
    requests: Arc<RwLock<Vec<AssetRequest>>>,
    /// If set, the next request fails with this error.
    next_error: Arc<RwLock<Option<AssetError>>>,
}

impl MockAssetGenerator {
    /// Create a new mock generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next request to fail with the given error.
    pub async fn set_next_error(&self, error: AssetError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get every recorded request.
    pub async fn recorded_requests(&self) -> Vec<AssetRequest> {
        self.requests.read().await.clone()
    }

    /// Clear recorded requests.
    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl AssetGenerator for MockAssetGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &AssetRequest) -> Result<(), AssetError> {
        self.requests.write().await.push(request.clone());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        if let Some(parent) = request.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.destination, request.kind.as_str()).await?;
        Ok(())
    }
}
