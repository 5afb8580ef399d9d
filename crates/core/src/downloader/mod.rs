//! Trailer downloads.
//!
//! The core picks the video; the backend only fetches a URL into a folder
//! under a given file stem. [`YtDlpDownloader`] drives the `yt-dlp` binary.

mod error;
mod traits;
mod types;
mod yt_dlp;

pub use error::DownloadError;
pub use traits::TrailerDownloader;
pub use types::{DownloadJob, DownloadedFile};
pub use yt_dlp::YtDlpDownloader;
