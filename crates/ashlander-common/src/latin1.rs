//! Single-byte text encoding used by the game's data files.
//!
//! Strings on disk are raw bytes in the Windows code page the game shipped
//! with. Decoding each byte to the Unicode code point of the same value keeps
//! every byte sequence intact through a load/save cycle, whatever the page.

use std::borrow::Cow;

/// Decode raw bytes, one character per byte.
pub fn decode(bytes: &[u8]) -> String {
    if bytes.is_ascii() {
        // ASCII is already valid UTF-8.
        return String::from_utf8_lossy(bytes).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode text back to one byte per character.
///
/// Characters above U+00FF have no single-byte form and are written as `?`.
pub fn encode(text: &str) -> Cow<'_, [u8]> {
    if text.is_ascii() {
        return Cow::Borrowed(text.as_bytes());
    }
    Cow::Owned(
        text.chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect(),
    )
}

/// Number of bytes `text` occupies once encoded.
pub fn encoded_len(text: &str) -> usize {
    if text.is_ascii() {
        text.len()
    } else {
        text.chars().count()
    }
}

/// The prefix of `bytes` before the first NUL, or all of it if there is none.
#[inline]
pub fn until_nul(bytes: &[u8]) -> &[u8] {
    match memchr::memchr(0, bytes) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_bytes_survive() {
        let raw = [b'D', 0xE9, b'j', 0xE0, 0xFF];
        let text = decode(&raw);
        assert_eq!(text.chars().count(), 5);
        assert_eq!(encode(&text).as_ref(), &raw);
        assert_eq!(encoded_len(&text), 5);
    }

    #[test]
    fn test_unmappable_becomes_question_mark() {
        assert_eq!(encode("a\u{20AC}b").as_ref(), b"a?b");
    }

    #[test]
    fn test_until_nul() {
        assert_eq!(until_nul(b"abc\0def"), b"abc");
        assert_eq!(until_nul(b"abc"), b"abc");
        assert_eq!(until_nul(b"\0"), b"");
    }
}
