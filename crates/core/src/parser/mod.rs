//! Filename parsing.
//!
//! Turns raw video filenames such as `The.Matrix.1999.1080p.BluRay.mkv` into
//! a title and a release year, ready to be looked up in the metadata service.

mod filename;
mod junk;
mod types;

pub use filename::{is_normalized_stem, parse_filename, FilenameParser};
pub use junk::JunkVocabulary;
pub use types::{ParseOutcome, ParseResult};
