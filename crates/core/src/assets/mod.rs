//! Placeholder and backdrop generation.
//!
//! Upcoming movies get a short black placeholder video named like the movie
//! file and a black backdrop image, so media servers list them next to the
//! trailer. [`FfmpegAssetGenerator`] renders both with ffmpeg's `lavfi`
//! color source.

mod error;
mod ffmpeg;
mod traits;
mod types;

pub use error::AssetError;
pub use ffmpeg::FfmpegAssetGenerator;
pub use traits::AssetGenerator;
pub use types::AssetRequest;
