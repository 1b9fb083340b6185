use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::object::Object;
use crate::shared::Shared;

/// The outbound side of a client session. Commands append RESP fragments
/// here; the session task drains it to the socket. Small integers and short
/// bulk headers come from the shared pool instead of being formatted.
#[derive(Debug)]
pub struct ReplyBuffer {
    buf: BytesMut,
    shared: Arc<Shared>,
}

impl ReplyBuffer {
    pub fn new(shared: Arc<Shared>) -> ReplyBuffer {
        ReplyBuffer {
            buf: BytesMut::with_capacity(16 * 1024),
            shared,
        }
    }

    /// Raw append. All other reply forms funnel through this.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn push_shared(&mut self, bytes: &Bytes) {
        self.buf.extend_from_slice(bytes);
    }

    /// `-ERR <msg>\r\n`, unless the message already carries its own error
    /// class prefix.
    pub fn error(&mut self, msg: &str) {
        if !msg.starts_with('-') {
            self.push(b"-ERR ");
        }
        self.push(msg.as_bytes());
        self.push(b"\r\n");
    }

    /// `+<msg>\r\n`
    pub fn status(&mut self, msg: &str) {
        self.push(b"+");
        self.push(msg.as_bytes());
        self.push(b"\r\n");
    }

    /// `:<i>\r\n`, shared for 0 and 1.
    pub fn integer(&mut self, value: i64) {
        match value {
            0 => self.buf.extend_from_slice(&self.shared.czero),
            1 => self.buf.extend_from_slice(&self.shared.cone),
            _ => self.push(format!(":{value}\r\n").as_bytes()),
        }
    }

    /// `$<len>\r\n<bytes>\r\n`; absent or empty payloads produce the shared
    /// null bulk `$-1\r\n`.
    pub fn bulk(&mut self, payload: Option<&[u8]>) {
        let Some(payload) = payload.filter(|p| !p.is_empty()) else {
            self.null_bulk();
            return;
        };
        match self.shared.bulk_hdr(payload.len()) {
            Some(hdr) => self.buf.extend_from_slice(hdr),
            None => self
                .buf
                .extend_from_slice(format!("${}\r\n", payload.len()).as_bytes()),
        }
        self.push(payload);
        self.push(b"\r\n");
    }

    pub fn null_bulk(&mut self) {
        self.buf.extend_from_slice(&self.shared.null_bulk);
    }

    /// `*<n>\r\n`, shared for small n.
    pub fn multi_bulk_len(&mut self, n: usize) {
        match self.shared.multi_bulk_hdr(n) {
            Some(hdr) => self.buf.extend_from_slice(hdr),
            None => self
                .buf
                .extend_from_slice(format!("*{n}\r\n").as_bytes()),
        }
    }

    /// Emit a string object as a bulk string, materializing the decimal
    /// form of an int encoding on the fly.
    pub fn bulk_object(&mut self, object: &Object) {
        let bytes = object.to_bytes();
        self.bulk(Some(&bytes[..]));
    }

    pub fn ok(&mut self) {
        self.buf.extend_from_slice(&self.shared.ok);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Detach up to `max` pending bytes for a write pass.
    pub fn take_chunk(&mut self, max: usize) -> Bytes {
        let n = self.buf.len().min(max);
        self.buf.split_to(n).freeze()
    }
}
