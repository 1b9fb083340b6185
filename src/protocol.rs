use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error as ThisError;

use crate::utils::split_args::split_args;

/// Limit on the size of an inline request line.
pub const PROTO_INLINE_MAX_SIZE: usize = 64 * 1024;

/// Limit on the element count of a multi-bulk request.
pub const PROTO_MAX_MULTIBULK_LEN: i64 = 1024 * 1024;

/// Malformed framing. Every variant renders as the message sent back to the
/// client (behind the `-ERR ` prefix) before the connection is closed.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Protocol error: too big inline request")]
    InlineTooLarge,
    #[error("Protocol error: unbalanced quotes in request")]
    UnbalancedQuotes,
    #[error("Protocol error: invalid multibulk length")]
    InvalidMultibulkLength,
    #[error("Protocol error: expected '$', got '{0}'")]
    ExpectedBulkHeader(char),
    #[error("Protocol error: invalid bulk length")]
    InvalidBulkLength,
    #[error("Protocol error: invalid bulk format")]
    InvalidBulkFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestType {
    #[default]
    Unknown,
    Inline,
    MultiBulk,
}

/// Incremental request parser. The dialect and the multi-bulk progress
/// (`remaining`, `bulk_len`, accumulated arguments) live here rather than on
/// the stack, so a request split across any number of reads resumes exactly
/// where the previous call stopped.
#[derive(Debug)]
pub struct Parser {
    request_type: RequestType,
    remaining: usize,
    bulk_len: Option<usize>,
    argv: Vec<Bytes>,
    proto_max_bulk_len: usize,
}

impl Parser {
    pub fn new(proto_max_bulk_len: usize) -> Parser {
        Parser {
            request_type: RequestType::Unknown,
            remaining: 0,
            bulk_len: None,
            argv: Vec::new(),
            proto_max_bulk_len,
        }
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Try to frame the next request out of `buf`. `Ok(Some(argv))` consumes
    /// the framed bytes; `Ok(None)` means more input is needed and nothing
    /// beyond fully parsed pieces was consumed. An `Err` is fatal for the
    /// connection.
    pub fn parse(&mut self, buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>, ProtocolError> {
        if self.request_type == RequestType::Unknown {
            assert!(
                self.argv.is_empty(),
                "parser entered with leftover arguments"
            );
            let Some(&first) = buf.first() else {
                return Ok(None);
            };
            self.request_type = if first == b'*' {
                RequestType::MultiBulk
            } else {
                RequestType::Inline
            };
        }

        match self.request_type {
            RequestType::Inline => self.parse_inline(buf),
            RequestType::MultiBulk => self.parse_multibulk(buf),
            RequestType::Unknown => unreachable!(),
        }
    }

    fn finish(&mut self) -> Result<Option<Vec<Bytes>>, ProtocolError> {
        self.request_type = RequestType::Unknown;
        self.remaining = 0;
        self.bulk_len = None;
        Ok(Some(std::mem::take(&mut self.argv)))
    }

    fn parse_inline(&mut self, buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>, ProtocolError> {
        let Some(newline) = buf.iter().position(|&b| b == b'\n') else {
            if buf.len() > PROTO_INLINE_MAX_SIZE {
                return Err(ProtocolError::InlineTooLarge);
            }
            return Ok(None);
        };

        let mut line_end = newline;
        if line_end > 0 && buf[line_end - 1] == b'\r' {
            line_end -= 1;
        }

        let tokens =
            split_args(&buf[..line_end]).ok_or(ProtocolError::UnbalancedQuotes)?;
        buf.advance(newline + 1);

        self.argv = tokens.into_iter().filter(|t| !t.is_empty()).collect();
        self.finish()
    }

    fn parse_multibulk(&mut self, buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>, ProtocolError> {
        if self.remaining == 0 {
            // Fresh request: the `*<count>` header line, '*' already seen.
            let Some(line) = take_line(buf) else {
                return Ok(None);
            };
            let count = parse_i64(&line[1..]).ok_or(ProtocolError::InvalidMultibulkLength)?;
            if count > PROTO_MAX_MULTIBULK_LEN {
                return Err(ProtocolError::InvalidMultibulkLength);
            }
            if count <= 0 {
                // Empty request, a no-op for the session.
                return self.finish();
            }
            self.remaining = count as usize;
            self.argv.reserve(self.remaining);
        }

        while self.remaining > 0 {
            if self.bulk_len.is_none() {
                let Some(&first) = buf.first() else {
                    return Ok(None);
                };
                if first != b'$' {
                    return Err(ProtocolError::ExpectedBulkHeader(first as char));
                }
                let Some(line) = take_line(buf) else {
                    return Ok(None);
                };
                let len = parse_i64(&line[1..]).ok_or(ProtocolError::InvalidBulkLength)?;
                if len < 0 || len as usize > self.proto_max_bulk_len {
                    return Err(ProtocolError::InvalidBulkLength);
                }
                self.bulk_len = Some(len as usize);
            }

            let len = self.bulk_len.unwrap();
            if buf.len() < len + 2 {
                return Ok(None);
            }
            let data = buf.split_to(len).freeze();
            if &buf[..2] != b"\r\n" {
                return Err(ProtocolError::InvalidBulkFormat);
            }
            buf.advance(2);

            self.argv.push(data);
            self.bulk_len = None;
            self.remaining -= 1;
        }

        self.finish()
    }
}

/// Consume one `\r\n`-terminated line, excluding the terminator. `None`
/// when the buffer does not hold a complete line yet.
fn take_line(buf: &mut BytesMut) -> Option<Bytes> {
    let pos = buf.windows(2).position(|w| w == b"\r\n")?;
    let line = buf.split_to(pos).freeze();
    buf.advance(2);
    Some(line)
}

fn parse_i64(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
