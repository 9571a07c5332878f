//! PNG chunk model and the iTXt writer/reader pair.
//!
//! # Wire layout
//! ```text
//! +--------+--------+-----------------+--------+
//! | length | type   | payload         | crc    |
//! | u32 BE | 4 ASCII| `length` bytes  | u32 BE |
//! +--------+--------+-----------------+--------+
//! ```
//! The CRC covers `type ++ payload`.  CRCs are computed on write and are
//! never verified on read.
//!
//! # iTXt restriction
//! [`Chunk::text`] always writes an uncompressed iTXt with an empty language
//! tag and an empty translated keyword.  [`extract_text`] relies on that exact
//! shape and skips a fixed `keyword + 5` bytes; it is not a general iTXt
//! reader.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};
use thiserror::Error;

use crate::crc::{crc32, ITXT_SEED};

/// Framing overhead around a payload: length + type + crc.
pub const CHUNK_OVERHEAD: usize = 12;

/// Bytes between the keyword and the text in a [`Chunk::text`] payload:
/// NUL, compression flag, compression method, NUL (language), NUL (translated keyword).
pub const ITXT_HEADER_TAIL: usize = 5;

// ── ChunkType ────────────────────────────────────────────────────────────────

/// Four-byte ASCII chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    pub const ITXT: ChunkType = ChunkType(*b"iTXt");
    pub const TEXT: ChunkType = ChunkType(*b"tEXt");
    pub const IEND: ChunkType = ChunkType(*b"IEND");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({self})")
    }
}

impl From<[u8; 4]> for ChunkType {
    fn from(tag: [u8; 4]) -> Self {
        ChunkType(tag)
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("keyword {0:?} is not representable in Latin-1")]
    KeywordNotLatin1(String),
    #[error("keyword must be 1-79 bytes, got {0}")]
    KeywordLength(usize),
    #[error("{chunk_type} payload too short: need {needed} bytes, have {available}")]
    PayloadTooShort { chunk_type: ChunkType, needed: usize, available: usize },
    #[error("payload of {0} bytes exceeds the chunk length field")]
    PayloadTooLarge(usize),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Chunk ────────────────────────────────────────────────────────────────────

/// One chunk's type and payload.  Length and CRC are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_type: ChunkType,
    pub payload:    Vec<u8>,
}

impl Chunk {
    /// Wrap already-extracted payload bytes.
    pub fn decode_payload(chunk_type: ChunkType, raw: &[u8]) -> Self {
        Self { chunk_type, payload: raw.to_vec() }
    }

    /// Build an uncompressed iTXt chunk carrying `text` under `keyword`.
    pub fn text(keyword: &str, text: &str) -> Result<Self, ChunkError> {
        let keyword_bytes = encode_latin1(keyword)?;
        if keyword_bytes.is_empty() || keyword_bytes.len() > 79 {
            return Err(ChunkError::KeywordLength(keyword_bytes.len()));
        }

        let mut payload = Vec::with_capacity(keyword_bytes.len() + ITXT_HEADER_TAIL + text.len());
        payload.extend_from_slice(&keyword_bytes);
        payload.push(0); // keyword terminator
        payload.push(0); // compression flag: uncompressed
        payload.push(0); // compression method
        payload.push(0); // empty language tag
        payload.push(0); // empty translated keyword
        payload.extend_from_slice(text.as_bytes());

        Ok(Self { chunk_type: ChunkType::ITXT, payload })
    }

    pub fn length(&self) -> u32 {
        self.payload.len() as u32
    }

    /// CRC over `type ++ payload`.
    pub fn crc(&self) -> u32 {
        let seed = if self.chunk_type == ChunkType::ITXT {
            ITXT_SEED
        } else {
            crc32(self.chunk_type.as_bytes(), 0)
        };
        crc32(&self.payload, seed)
    }

    /// Size of the serialized chunk including framing.
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + CHUNK_OVERHEAD
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), ChunkError> {
        if self.payload.len() > u32::MAX as usize {
            return Err(ChunkError::PayloadTooLarge(self.payload.len()));
        }
        writer.write_u32::<BigEndian>(self.length())?;
        writer.write_all(self.chunk_type.as_bytes())?;
        writer.write_all(&self.payload)?;
        writer.write_u32::<BigEndian>(self.crc())?;
        Ok(())
    }

    /// Serialize to `length ++ type ++ payload ++ crc`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChunkError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write(&mut out)?;
        Ok(out)
    }

    /// Read one framed chunk.  The stored CRC is consumed and discarded.
    pub fn read<R: Read>(mut reader: R) -> Result<Self, ChunkError> {
        let length = reader.read_u32::<BigEndian>()? as usize;
        let mut tag = [0u8; 4];
        reader.read_exact(&mut tag)?;
        let mut payload = Vec::new();
        reader.by_ref().take(length as u64).read_to_end(&mut payload)?;
        if payload.len() != length {
            return Err(ChunkError::Io(io::ErrorKind::UnexpectedEof.into()));
        }
        let _crc = reader.read_u32::<BigEndian>()?;
        Ok(Self { chunk_type: ChunkType(tag), payload })
    }
}

/// Recover the text from a chunk produced by [`Chunk::text`] with `keyword`.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn extract_text(chunk: &Chunk, keyword: &str) -> Result<String, ChunkError> {
    // Latin-1 is one byte per character.
    let skip = keyword.chars().count() + ITXT_HEADER_TAIL;
    let text = chunk.payload.get(skip..).ok_or(ChunkError::PayloadTooShort {
        chunk_type: chunk.chunk_type,
        needed:     skip,
        available:  chunk.payload.len(),
    })?;
    Ok(String::from_utf8_lossy(text).into_owned())
}

/// `"{width}x{height}"` from an IHDR payload.
pub fn extract_resolution(ihdr: &Chunk) -> Result<String, ChunkError> {
    let mut header = ihdr.payload.get(..8).ok_or(ChunkError::PayloadTooShort {
        chunk_type: ihdr.chunk_type,
        needed:     8,
        available:  ihdr.payload.len(),
    })?;
    let width = header.read_u32::<BigEndian>()?;
    let height = header.read_u32::<BigEndian>()?;
    Ok(format!("{width}x{height}"))
}

fn encode_latin1(s: &str) -> Result<Vec<u8>, ChunkError> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| ChunkError::KeywordNotLatin1(s.to_owned())))
        .collect()
}
