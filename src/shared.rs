use std::sync::Arc;

use bytes::Bytes;

use crate::object::Object;

/// Integers in `[0, SHARED_INTEGERS)` resolve to a single pre-built object.
pub const SHARED_INTEGERS: usize = 10_000;

/// Multi-bulk and bulk headers for lengths below this come out of the pool
/// instead of being formatted per reply.
pub const SHARED_BULKHDR_LEN: usize = 32;

/// Pre-built reply fragments and the shared small-integer pool. Built once
/// at boot and immutable afterwards; cloning the `Bytes` handles is
/// refcount-only.
#[derive(Debug)]
pub struct Shared {
    pub crlf: Bytes,
    pub ok: Bytes,
    pub pong: Bytes,
    pub null_bulk: Bytes,
    pub czero: Bytes,
    pub cone: Bytes,
    pub noauth_err: Bytes,
    pub oom_err: Bytes,
    pub loading_err: Bytes,
    pub denied_err: Bytes,
    pub max_clients_err: Bytes,
    multi_bulk_hdr: Vec<Bytes>,
    bulk_hdr: Vec<Bytes>,
    integers: Vec<Arc<Object>>,
}

impl Shared {
    pub fn new() -> Shared {
        let multi_bulk_hdr = (0..SHARED_BULKHDR_LEN)
            .map(|n| Bytes::from(format!("*{n}\r\n")))
            .collect();
        let bulk_hdr = (0..SHARED_BULKHDR_LEN)
            .map(|n| Bytes::from(format!("${n}\r\n")))
            .collect();
        let integers = (0..SHARED_INTEGERS)
            .map(|i| Arc::new(Object::raw_int(i as i64)))
            .collect();

        Shared {
            crlf: Bytes::from_static(b"\r\n"),
            ok: Bytes::from_static(b"+OK\r\n"),
            pong: Bytes::from_static(b"+PONG\r\n"),
            null_bulk: Bytes::from_static(b"$-1\r\n"),
            czero: Bytes::from_static(b":0\r\n"),
            cone: Bytes::from_static(b":1\r\n"),
            noauth_err: Bytes::from_static(b"-NOAUTH Authentication required.\r\n"),
            oom_err: Bytes::from_static(
                b"-OOM command not allowed when used memory > 'maxmemory'.\r\n",
            ),
            loading_err: Bytes::from_static(
                b"-LOADING Kiwi is loading the dataset in memory\r\n",
            ),
            denied_err: Bytes::from_static(
                b"-DENIED Kiwi is running in protected mode because protected mode is enabled, \
no bind address was specified and no authentication password is requested to clients. In this \
mode connections are only accepted from the loopback interface. If you want to connect from \
external computers, either disable protected mode with '--protected-mode false', set up a bind \
address, or set an authentication password.\r\n",
            ),
            max_clients_err: Bytes::from_static(b"-ERR max number of clients reached\r\n"),
            multi_bulk_hdr,
            bulk_hdr,
            integers,
        }
    }

    /// The shared object for `i`, when `i` is in the pooled range.
    pub fn integer(&self, i: i64) -> Option<Arc<Object>> {
        if (0..SHARED_INTEGERS as i64).contains(&i) {
            Some(self.integers[i as usize].clone())
        } else {
            None
        }
    }

    /// Pre-built `*<n>\r\n` header for small n.
    pub fn multi_bulk_hdr(&self, n: usize) -> Option<&Bytes> {
        self.multi_bulk_hdr.get(n)
    }

    /// Pre-built `$<n>\r\n` header for small n.
    pub fn bulk_hdr(&self, n: usize) -> Option<&Bytes> {
        self.bulk_hdr.get(n)
    }
}

impl Default for Shared {
    fn default() -> Self {
        Shared::new()
    }
}
