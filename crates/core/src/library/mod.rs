//! On-disk library layout: scanning for videos and canonical naming.

mod naming;
mod scan;

pub use naming::{
    backdrop_path, canonical_movie_path, find_trailer, folder_name, placeholder_path,
    trailer_path, BACKDROP_FILE_NAME, TRAILER_SUFFIX,
};
pub use scan::{empty_folders, movie_folders, scan_videos, ScanOutcome};
