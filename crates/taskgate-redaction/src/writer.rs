//! `io::Write` adapter that masks registered secrets on the way out.

use std::io::{self, Write};

use crate::global::secrets_masker;
use crate::masker::SecretsMasker;

/// Redacts each buffer before forwarding it to `inner`.
///
/// Matching happens per `write` call, so a secret split across two calls is
/// not caught. Log formatters write one whole event at a time.
pub struct RedactedWriter<'a, W: Write> {
    inner: W,
    masker: &'a SecretsMasker,
}

impl<'a, W: Write> RedactedWriter<'a, W> {
    pub fn new(inner: W, masker: &'a SecretsMasker) -> Self {
        Self { inner, masker }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> RedactedWriter<'static, W> {
    /// Writer backed by the process-global masker.
    pub fn global(inner: W) -> Self {
        Self::new(inner, secrets_masker())
    }
}

impl<W: Write> Write for RedactedWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let redacted = self.masker.redact_str(&text);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_are_redacted() {
        let masker = SecretsMasker::default();
        masker.mask_secret("hunter22", None);

        let mut writer = RedactedWriter::new(Vec::new(), &masker);
        writeln!(writer, "login with hunter22 failed").unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "login with *** failed\n");
    }
}
