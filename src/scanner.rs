//! Forward chunk walker over an in-memory PNG prefix.
//!
//! The walker starts right after the 8-byte signature and reads each chunk's
//! length and tag, advancing by `length + 12`.  It stops:
//! - after yielding `IEND` (trailing bytes are never interpreted);
//! - when a chunk header or its declared payload + CRC would run past the
//!   buffer, which covers both corrupt lengths and chunks beyond a bounded
//!   read window.
//!
//! Neither case is an error: a chunk that cannot be reached is simply absent.

use crate::chunk::{Chunk, ChunkType, CHUNK_OVERHEAD};
use crate::container::PNG_SIGNATURE;

/// Position of one chunk inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Offset of the chunk's length field.
    pub offset: usize,
    /// Payload length as declared in the chunk header.
    pub length: usize,
}

impl ChunkLocation {
    /// Offset of the first payload byte.
    pub fn payload_start(&self) -> usize {
        self.offset + 8
    }

    /// Offset one past the CRC; where the next chunk begins.
    pub fn end(&self) -> usize {
        self.offset + self.length + CHUNK_OVERHEAD
    }
}

/// One chunk as seen by [`Chunks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedChunk {
    pub location:   ChunkLocation,
    pub chunk_type: ChunkType,
    /// CRC as stored in the file; not verified.
    pub stored_crc: u32,
}

/// Iterator over the chunks of a PNG buffer.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    buf:  &'a [u8],
    pos:  usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    /// Walk `buf`, which must begin with the PNG signature.  The signature
    /// itself is not checked here.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: PNG_SIGNATURE.len(), done: false }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = ScannedChunk;

    fn next(&mut self) -> Option<ScannedChunk> {
        if self.done {
            return None;
        }
        let offset = self.pos;
        let Some(header) = offset.checked_add(8).and_then(|end| self.buf.get(offset..end)) else {
            self.done = true;
            return None;
        };

        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let chunk_type = ChunkType([header[4], header[5], header[6], header[7]]);
        let location = ChunkLocation { offset, length };

        let Some(end) = offset.checked_add(length).and_then(|n| n.checked_add(CHUNK_OVERHEAD)) else {
            self.done = true;
            return None;
        };
        if end > self.buf.len() {
            self.done = true;
            return None;
        }

        let crc = &self.buf[end - 4..end];
        let stored_crc = u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]);

        self.pos = end;
        if chunk_type == ChunkType::IEND {
            self.done = true;
        }
        Some(ScannedChunk { location, chunk_type, stored_crc })
    }
}

/// Locate the first chunk tagged `chunk_type` before `IEND`.
pub fn find_chunk(buf: &[u8], chunk_type: ChunkType) -> Option<ChunkLocation> {
    Chunks::new(buf)
        .find(|c| c.chunk_type == chunk_type)
        .map(|c| c.location)
}

/// Offset right after the chunk tagged `chunk_type`; the splice point used
/// when inserting a chunk after `IHDR`.
pub fn chunk_end(buf: &[u8], chunk_type: ChunkType) -> Option<usize> {
    find_chunk(buf, chunk_type).map(|loc| loc.end())
}

/// Copy out the payload of the chunk at `location`.
pub fn read_chunk(buf: &[u8], chunk_type: ChunkType, location: ChunkLocation) -> Option<Chunk> {
    let start = location.payload_start();
    buf.get(start..start + location.length)
        .map(|raw| Chunk::decode_payload(chunk_type, raw))
}

/// Every chunk visible in `buf`, in file order.
pub fn list_chunks(buf: &[u8]) -> Vec<ScannedChunk> {
    Chunks::new(buf).collect()
}
