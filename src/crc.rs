//! Table-driven CRC-32 (reflected polynomial `0xEDB88320`), the variant used
//! by PNG chunk checksums and zlib.
//!
//! # Table construction
//! [`CRC_TABLE`] is produced by a `const fn` and baked into the binary.  There
//! is no lazy initialisation path, so concurrent callers never race on it.
//!
//! # Seeding
//! The `seed` argument is a previous CRC result (0 for a fresh checksum).  The
//! register is complemented on entry and on exit, so checksums chain:
//!
//! ```
//! use vrshot::crc::crc32;
//! let whole = crc32(b"iTXthello", 0);
//! let chained = crc32(b"hello", crc32(b"iTXt", 0));
//! assert_eq!(whole, chained);
//! ```

/// Reflected form of the PNG/zlib generator polynomial.
pub const POLYNOMIAL: u32 = 0xEDB8_8320;

/// 256-entry lookup table, one entry per byte value.
pub static CRC_TABLE: [u32; 256] = build_table();

/// CRC of the `iTXt` tag alone; a valid starting seed for text chunk payloads.
pub const ITXT_SEED: u32 = crc32_const(b"iTXt");

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLYNOMIAL } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

// Compile-time variant used for precomputed tag seeds.
const fn crc32_const(bytes: &[u8]) -> u32 {
    let table = build_table();
    let mut crc = 0xFFFF_FFFFu32;
    let mut i = 0;
    while i < bytes.len() {
        crc = table[((crc ^ bytes[i] as u32) & 0xFF) as usize] ^ (crc >> 8);
        i += 1;
    }
    crc ^ 0xFFFF_FFFF
}

/// Checksum `bytes`, continuing from `seed`.
#[inline]
pub fn crc32(bytes: &[u8], seed: u32) -> u32 {
    let mut crc = seed ^ 0xFFFF_FFFF;
    for &byte in bytes {
        crc = CRC_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8);
    }
    crc ^ 0xFFFF_FFFF
}

/// Checksum `length` bytes of `bytes` starting at `offset`.
///
/// Returns `None` when the range falls outside the slice.
pub fn crc32_range(bytes: &[u8], offset: usize, length: usize, seed: u32) -> Option<u32> {
    let end = offset.checked_add(length)?;
    bytes.get(offset..end).map(|range| crc32(range, seed))
}
