//! Classify description text and hand it to the matching parser.

use std::path::Path;

use super::{lfs, MetadataError, ScreenshotMetadata};
use crate::container::{read_description, ReadOptions};

/// Wire format of a description, decided from its leading characters only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Lfs,
    Json,
}

pub fn classify(text: &str) -> Option<TextFormat> {
    if text.starts_with(lfs::APP_LFS) || text.starts_with(lfs::APP_SCREENSHOT_MANAGER) {
        Some(TextFormat::Lfs)
    } else if text.starts_with('{') {
        Some(TextFormat::Json)
    } else {
        None
    }
}

/// Decode a description string.
pub fn decode_text(text: &str) -> Result<ScreenshotMetadata, MetadataError> {
    match classify(text) {
        Some(TextFormat::Lfs)  => lfs::parse(text),
        Some(TextFormat::Json) => Ok(ScreenshotMetadata::from_json(text)?),
        None => Err(MetadataError::UnknownFormat),
    }
}

/// Read and decode the description embedded in `path`.
///
/// `Ok(None)` means the file is a PNG without a description chunk.
pub fn decode_file<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<Option<ScreenshotMetadata>, MetadataError> {
    let path = path.as_ref();
    let Some(text) = read_description(path, opts)? else {
        return Ok(None);
    };
    let mut meta = decode_text(&text)?;
    meta.source_file = Some(path.to_path_buf());
    Ok(Some(meta))
}
