//! File-level PNG access: signature check, bounded reads, and the
//! description write path.
//!
//! ```no_run
//! use vrshot::container::{read_description, write_description, ReadOptions};
//!
//! let opts = ReadOptions::default();
//! if write_description("shot.png", "lfs|2|pos:0,0,0", &opts)? {
//!     println!("embedded");
//! }
//! let text = read_description("shot.png", &opts)?;
//! # Ok::<(), vrshot::container::ContainerError>(())
//! ```
//!
//! # Bounded reads
//! Readers only look at the first [`ReadOptions::window_size`] bytes of a
//! file.  Screenshots carry `IHDR` first and the description chunk right
//! behind it, so both sit well inside the default 128 KiB.  Chunks past the
//! window are reported as absent.
//!
//! # Write policy
//! [`write_description`] splices a fresh iTXt chunk directly after `IHDR` and
//! rewrites the file.  It refuses (returns `Ok(false)`) when the file is not
//! a PNG, has no reachable `IHDR`, or already contains any iTXt chunk.  The
//! keyword of the existing chunk is not compared.  The new contents are staged
//! in a temp file next to the original and renamed over it.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::chunk::{extract_resolution, extract_text, Chunk, ChunkError, ChunkType};
use crate::scanner::{chunk_end, find_chunk, read_chunk};

/// `89 50 4E 47 0D 0A 1A 0A`
pub const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";

/// Default read window: 128 KiB.
pub const DEFAULT_WINDOW_SIZE: usize = 128 * 1024;

/// Keyword under which screenshot tools store their description text.
pub const DEFAULT_KEYWORD: &str = "Description";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Not a PNG file")]
    NotAContainerFile,
    #[error("{0} chunk not found")]
    ChunkNotFound(ChunkType),
    #[error("Chunk error: {0}")]
    Chunk(#[from] ChunkError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── ReadOptions ──────────────────────────────────────────────────────────────

/// Configuration shared by the read and write paths.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Bytes read from the start of a file when looking for chunks.
    pub window_size: usize,
    /// iTXt keyword written by [`write_description`] and skipped on read.
    pub keyword:     String,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            keyword:     DEFAULT_KEYWORD.to_owned(),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

pub fn is_png(buf: &[u8]) -> bool {
    buf.starts_with(&PNG_SIGNATURE)
}

/// Read at most `window_size` bytes from the start of `path`.
pub fn read_window<P: AsRef<Path>>(path: P, window_size: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut buf = Vec::with_capacity(window_size.min(DEFAULT_WINDOW_SIZE));
    file.take(window_size as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Read the PNG prefix of `path`, rejecting non-PNG files.
pub fn read_png_window<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<Vec<u8>, ContainerError> {
    let buf = read_window(path, opts.window_size)?;
    if !is_png(&buf) {
        return Err(ContainerError::NotAContainerFile);
    }
    Ok(buf)
}

/// First chunk tagged `chunk_type` inside the read window.
pub fn read_chunk_from_file<P: AsRef<Path>>(
    path:       P,
    chunk_type: ChunkType,
    opts:       &ReadOptions,
) -> Result<Chunk, ContainerError> {
    let buf = read_png_window(path, opts)?;
    find_chunk(&buf, chunk_type)
        .and_then(|loc| read_chunk(&buf, chunk_type, loc))
        .ok_or(ContainerError::ChunkNotFound(chunk_type))
}

// ── Read ─────────────────────────────────────────────────────────────────────

/// Embedded description text, or `None` when the file carries no iTXt chunk.
pub fn read_description<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<Option<String>, ContainerError> {
    match read_chunk_from_file(path, ChunkType::ITXT, opts) {
        Ok(chunk) => Ok(Some(extract_text(&chunk, &opts.keyword)?)),
        Err(ContainerError::ChunkNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// `"{width}x{height}"` from the file's IHDR chunk.
pub fn read_resolution<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<String, ContainerError> {
    let ihdr = read_chunk_from_file(path, ChunkType::IHDR, opts)?;
    Ok(extract_resolution(&ihdr)?)
}

/// Whether any iTXt chunk is visible in the read window.
pub fn has_text_chunk<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<bool, ContainerError> {
    let buf = read_png_window(path, opts)?;
    Ok(find_chunk(&buf, ChunkType::ITXT).is_some())
}

// ── Write ────────────────────────────────────────────────────────────────────

/// Insert `text` after `IHDR` in a PNG byte buffer.
///
/// Returns `Ok(None)` when the buffer is not a PNG, has no `IHDR`, or already
/// has an iTXt chunk.
pub fn insert_description(png: &[u8], text: &str, keyword: &str) -> Result<Option<Vec<u8>>, ContainerError> {
    if !is_png(png) || find_chunk(png, ChunkType::ITXT).is_some() {
        return Ok(None);
    }
    let Some(splice_at) = chunk_end(png, ChunkType::IHDR) else {
        return Ok(None);
    };

    let chunk = Chunk::text(keyword, text)?;
    let mut out = Vec::with_capacity(png.len() + chunk.encoded_len());
    out.extend_from_slice(&png[..splice_at]);
    chunk.write(&mut out)?;
    out.extend_from_slice(&png[splice_at..]);
    Ok(Some(out))
}

/// Embed `text` as the file's description.  `Ok(false)` means the file was
/// left untouched; see the module docs for when that happens.
pub fn write_description<P: AsRef<Path>>(path: P, text: &str, opts: &ReadOptions) -> Result<bool, ContainerError> {
    let path = path.as_ref();
    let png = fs::read(path)?;
    match insert_description(&png, text, &opts.keyword)? {
        Some(updated) => {
            replace_file(path, &updated)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Stage `bytes` in a temp file beside `path`, then rename it over `path`.
fn replace_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::list_chunks;

    fn minimal_png() -> Vec<u8> {
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&1920u32.to_be_bytes());
        ihdr.extend_from_slice(&1080u32.to_be_bytes());
        ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);

        let mut out = PNG_SIGNATURE.to_vec();
        out.extend(Chunk::decode_payload(ChunkType::IHDR, &ihdr).to_bytes().unwrap());
        out.extend(Chunk::decode_payload(ChunkType(*b"IDAT"), &[0x78, 0x9C, 0x03, 0x00]).to_bytes().unwrap());
        out.extend(Chunk::decode_payload(ChunkType::IEND, &[]).to_bytes().unwrap());
        out
    }

    #[test]
    fn inserts_right_after_ihdr() {
        let png = minimal_png();
        let updated = insert_description(&png, "lfs|2", DEFAULT_KEYWORD).unwrap().unwrap();
        let tags: Vec<_> = list_chunks(&updated).iter().map(|c| c.chunk_type).collect();
        assert_eq!(tags, [ChunkType::IHDR, ChunkType::ITXT, ChunkType(*b"IDAT"), ChunkType::IEND]);
        assert_eq!(&updated[..33], &png[..33]);
        assert_eq!(&updated[updated.len() - 28..], &png[png.len() - 28..]);
    }

    #[test]
    fn second_insert_is_refused() {
        let once = insert_description(&minimal_png(), "first", DEFAULT_KEYWORD).unwrap().unwrap();
        assert!(insert_description(&once, "second", DEFAULT_KEYWORD).unwrap().is_none());
    }

    #[test]
    fn unrelated_keyword_still_blocks() {
        let once = insert_description(&minimal_png(), "x", "Comment").unwrap().unwrap();
        assert!(insert_description(&once, "y", DEFAULT_KEYWORD).unwrap().is_none());
    }

    #[test]
    fn non_png_is_refused() {
        assert!(insert_description(b"GIF89a....", "x", DEFAULT_KEYWORD).unwrap().is_none());
    }

    #[test]
    fn png_without_ihdr_is_refused() {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend(Chunk::decode_payload(ChunkType::IEND, &[]).to_bytes().unwrap());
        assert!(insert_description(&png, "x", DEFAULT_KEYWORD).unwrap().is_none());
    }

    #[test]
    fn signature_detection() {
        assert!(is_png(&minimal_png()));
        assert!(!is_png(&PNG_SIGNATURE[..7]));
    }
}
