//! Types for the assets module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::AssetKind;

/// One asset to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRequest {
    pub kind: AssetKind,
    pub destination: PathBuf,
    /// Length of placeholder videos.
    pub duration_secs: u32,
    /// `WIDTHxHEIGHT`, e.g. `1920x1080`.
    pub resolution: String,
    /// Replace an existing file instead of leaving it alone.
    pub overwrite: bool,
}
