// src/ingest/lines.rs
//! Incremental newline splitter over arbitrary byte chunks.
//!
//! `\n` terminates a line and one trailing `\r` is dropped. A final
//! unterminated segment is a line; an empty final segment is not.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line exceeds {max} bytes")]
pub struct LineTooLong {
    pub max: usize,
}

#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    max_line: usize,
}

impl LineBuffer {
    pub fn new(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line: max_line.max(1),
        }
    }

    /// Append a chunk and return every line it completed. On an overlong
    /// line the lines completed before it are still returned alongside the
    /// error; the buffer must not be pushed to afterwards.
    pub fn push(&mut self, chunk: &[u8]) -> (Vec<String>, Option<LineTooLong>) {
        let mut out = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.buf.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];
            match self.take_line() {
                Ok(line) => out.push(line),
                Err(e) => return (out, Some(e)),
            }
        }
        self.buf.extend_from_slice(rest);
        let pending = self.buf.len() - usize::from(self.buf.last() == Some(&b'\r'));
        if pending > self.max_line {
            return (out, Some(LineTooLong { max: self.max_line }));
        }
        (out, None)
    }

    /// Flush the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Result<Option<String>, LineTooLong> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        self.take_line().map(Some)
    }

    fn take_line(&mut self) -> Result<String, LineTooLong> {
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        if self.buf.len() > self.max_line {
            return Err(LineTooLong { max: self.max_line });
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Ok(line)
    }
}
