//! Binary decoder primitives (spec.md §4.1).
//!
//! `utils.py::unpack`'s declarative `(label, (formatter, lower, upper))`
//! field list relies on Python duck typing (bounds as either integers or
//! closures over a growing dict) that has no direct, statically-typed
//! analogue. Rather than build a dynamic closure-based DSL to imitate it
//! literally, the NTFS record parsers in `ntfs::record`/`ntfs::indx` call
//! these small, pure extraction functions directly with bounds computed
//! from already-decoded fields — the same capability the Python bound
//! functions provide, expressed as ordinary Rust control flow. Every
//! function here is pure, stateless, and returns `None` instead of
//! panicking on a short or malformed slice, preserving the decoder's core
//! contract.
//!
//! The fixed-point extraction itself goes through `byteorder`'s
//! `read_uint`/`read_int` (arbitrary 1-8 byte widths, exactly what NTFS's
//! variable-length size/offset fields need), the same crate the teacher
//! reaches for in its own `Cursor`-based structure parsers.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Returns the inclusive byte range `[lo, hi]` of `data`, or `None` if the
/// range is empty or starts past the end of the buffer. A range that
/// partially overruns `data` is silently truncated, mirroring Python slice
/// semantics (`data[lo:hi+1]` never raises).
pub fn field_slice(data: &[u8], lo: usize, hi_inclusive: usize) -> Option<&[u8]> {
    if hi_inclusive < lo || lo >= data.len() {
        return None;
    }
    let hi_exclusive = (hi_inclusive + 1).min(data.len());
    Some(&data[lo..hi_exclusive])
}

/// Little-endian unsigned integer over `data[lo..=hi]`.
pub fn le_uint(data: &[u8], lo: usize, hi_inclusive: usize) -> Option<u64> {
    let chunk = field_slice(data, lo, hi_inclusive)?;
    le_uint_bytes(chunk)
}

pub fn le_uint_bytes(chunk: &[u8]) -> Option<u64> {
    if chunk.is_empty() || chunk.len() > 8 {
        return None;
    }
    Cursor::new(chunk).read_uint::<LittleEndian>(chunk.len()).ok()
}

/// Big-endian unsigned integer over `data[lo..=hi]`.
pub fn be_uint(data: &[u8], lo: usize, hi_inclusive: usize) -> Option<u64> {
    let chunk = field_slice(data, lo, hi_inclusive)?;
    be_uint_bytes(chunk)
}

pub fn be_uint_bytes(chunk: &[u8]) -> Option<u64> {
    if chunk.is_empty() || chunk.len() > 8 {
        return None;
    }
    Cursor::new(chunk).read_uint::<BigEndian>(chunk.len()).ok()
}

/// Little-endian signed integer (sign-extended from the high bit of the
/// last byte) over `data[lo..=hi]`. Used for NTFS runlist offset deltas.
pub fn le_int_signed(data: &[u8], lo: usize, hi_inclusive: usize) -> Option<i64> {
    let chunk = field_slice(data, lo, hi_inclusive)?;
    le_int_signed_bytes(chunk)
}

pub fn le_int_signed_bytes(chunk: &[u8]) -> Option<i64> {
    if chunk.is_empty() || chunk.len() > 8 {
        return None;
    }
    Cursor::new(chunk).read_int::<LittleEndian>(chunk.len()).ok()
}

/// Big-endian signed integer (sign-extended from the high bit of the first
/// byte) over `data[lo..=hi]`.
pub fn be_int_signed(data: &[u8], lo: usize, hi_inclusive: usize) -> Option<i64> {
    let chunk = field_slice(data, lo, hi_inclusive)?;
    be_int_signed_bytes(chunk)
}

pub fn be_int_signed_bytes(chunk: &[u8]) -> Option<i64> {
    if chunk.is_empty() || chunk.len() > 8 {
        return None;
    }
    Cursor::new(chunk).read_int::<BigEndian>(chunk.len()).ok()
}

/// Decodes UTF-16 text in 2-byte chunks, replacing any chunk that fails to
/// decode with a placeholder char, then returns `None` if the joined
/// result contains three consecutive NUL bytes (false-positive guard).
///
/// Grounded on `ntfs_fmt.py::printable_name`.
pub fn utf16_name(data: &[u8], lo: usize, hi_inclusive: usize) -> Option<String> {
    let chunk = field_slice(data, lo, hi_inclusive)?;
    utf16_name_bytes(chunk)
}

pub fn utf16_name_bytes(chunk: &[u8]) -> Option<String> {
    let mut decoded = String::with_capacity(chunk.len() / 2);
    for pair in chunk.chunks(2) {
        if pair.len() != 2 {
            decoded.push('\u{0}');
            continue;
        }
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        if (0xD800..=0xDFFF).contains(&unit) {
            // Lone surrogate half: a single 2-byte chunk can never decode
            // one, since surrogate pairs span two units.
            decoded.push('\u{0}');
        } else {
            decoded.push(char::from_u32(unit as u32).unwrap_or('\u{0}'));
        }
    }
    if decoded.contains("\u{0}\u{0}\u{0}") {
        return None;
    }
    Some(printable(&decoded, '#'))
}

/// Replaces characters outside the printable Unicode categories with
/// `placeholder`. Grounded on `utils.py::printable`.
pub fn printable(text: &str, placeholder: char) -> String {
    text.chars()
        .map(|c| if c.is_control() { placeholder } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le_uint_reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(le_uint(&data, 0, 3), Some(0x04030201));
    }

    #[test]
    fn be_uint_reads_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(be_uint(&data, 0, 3), Some(0x01020304));
    }

    #[test]
    fn le_int_signed_sign_extends_negative() {
        // -1 as a single byte: 0xFF
        let data = [0xFFu8];
        assert_eq!(le_int_signed(&data, 0, 0), Some(-1));
    }

    #[test]
    fn le_int_signed_positive_stays_positive() {
        let data = [0x05u8];
        assert_eq!(le_int_signed(&data, 0, 0), Some(5));
    }

    #[test]
    fn empty_range_yields_none() {
        let data = [0x01, 0x02];
        assert_eq!(le_uint(&data, 5, 3), None);
    }

    #[test]
    fn out_of_bounds_start_yields_none() {
        let data = [0x01, 0x02];
        assert_eq!(le_uint(&data, 10, 12), None);
    }

    #[test]
    fn utf16_name_decodes_ascii() {
        // "Hi" in UTF-16LE
        let data = [0x48, 0x00, 0x69, 0x00];
        assert_eq!(utf16_name(&data, 0, 3).as_deref(), Some("Hi"));
    }

    #[test]
    fn utf16_name_rejects_triple_nul() {
        let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(utf16_name(&data, 0, 5), None);
    }
}
