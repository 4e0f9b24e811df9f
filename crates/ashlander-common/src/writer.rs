//! Little-endian writing helpers on top of [`std::io::Write`].

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{latin1, Tag};

/// Extension methods for writing game-data primitives.
///
/// Integers go through `byteorder`; this trait adds the string and tag
/// shapes the record format uses.
pub trait WriteExt: Write {
    /// Write a four-byte tag.
    fn write_tag(&mut self, tag: Tag) -> io::Result<()> {
        self.write_all(tag.as_bytes())
    }

    /// Write `text` followed by a single NUL.
    fn write_zstring(&mut self, text: &str) -> io::Result<()> {
        self.write_all(&latin1::encode(text))?;
        self.write_u8(0)
    }

    /// Write `text` into a NUL-padded field of exactly `width` bytes.
    ///
    /// Text longer than `width - 1` bytes is cut so the field still ends in
    /// a NUL, and a warning is logged.
    fn write_fixed_string(&mut self, text: &str, width: usize) -> io::Result<()> {
        let encoded = latin1::encode(text);
        let keep = encoded.len().min(width.saturating_sub(1));
        if keep < encoded.len() {
            tracing::warn!(
                "string {:?} is {} bytes long and was truncated to {} bytes",
                text,
                encoded.len(),
                keep
            );
        }
        self.write_all(&encoded[..keep])?;
        write_zeros(self, width - keep)
    }

    /// Write three little-endian floats.
    fn write_vec3(&mut self, values: &[f32; 3]) -> io::Result<()> {
        for &v in values {
            self.write_f32::<LittleEndian>(v)?;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteExt for W {}

fn write_zeros<W: Write + ?Sized>(out: &mut W, count: usize) -> io::Result<()> {
    const ZEROS: [u8; 64] = [0; 64];
    let mut left = count;
    while left > 0 {
        let n = left.min(ZEROS.len());
        out.write_all(&ZEROS[..n])?;
        left -= n;
    }
    Ok(())
}

/// A writer adapter that counts the bytes passing through it.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Bytes written so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_write_zstring() {
        let mut out = Vec::new();
        out.write_zstring("Breton").unwrap();
        assert_eq!(out, b"Breton\0");
    }

    #[test]
    fn test_fixed_string_pads() {
        let mut out = Vec::new();
        out.write_fixed_string("gold_001", 32).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..8], b"gold_001");
        assert!(out[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fixed_string_truncates_to_width_minus_one() {
        let long = "x".repeat(40);
        let mut out = Vec::new();
        out.write_fixed_string(&long, 32).unwrap();
        assert_eq!(out.len(), 32);
        assert!(out[..31].iter().all(|&b| b == b'x'));
        assert_eq!(out[31], 0);
    }

    /// Log sink shared between a test and the subscriber it installs.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logs_while(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_truncation_is_logged() {
        let logs = logs_while(|| {
            let mut out = Vec::new();
            out.write_fixed_string(&"y".repeat(40), 32).unwrap();
        });
        assert!(logs.contains("WARN"), "{}", logs);
        assert!(logs.contains("truncated to 31 bytes"), "{}", logs);

        let logs = logs_while(|| {
            let mut out = Vec::new();
            out.write_fixed_string("short", 32).unwrap();
        });
        assert!(logs.is_empty(), "{}", logs);
    }

    #[test]
    fn test_counting_writer() {
        let mut out = CountingWriter::new(Vec::new());
        out.write_u32::<LittleEndian>(7).unwrap();
        out.write_zstring("ab").unwrap();
        assert_eq!(out.count(), 7);
        assert_eq!(out.into_inner().len(), 7);
    }

    proptest! {
        #[test]
        fn fixed_string_always_fills_width(text in "[ -~]{0,80}", width in 1usize..64) {
            let mut out = Vec::new();
            out.write_fixed_string(&text, width).unwrap();
            prop_assert_eq!(out.len(), width);
            prop_assert_eq!(out[width - 1], 0);
            let kept = text.len().min(width - 1);
            prop_assert_eq!(&out[..kept], &text.as_bytes()[..kept]);
        }
    }
}
