use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::shared::Shared;

/// Type tag of a stored value. Only strings carry operations in the core;
/// the remaining tags are reserved for the container types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Str,
    List,
    Hash,
    Set,
    ZSet,
}

/// Physical representation of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Int,
    Raw,
}

/// A string payload in one of its two encodings. `Int` holds values whose
/// textual form round-trips through a decimal parser; everything else is
/// `Raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Str {
    Int(i64),
    Raw(Bytes),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(Str),
}

/// A value stored in the keyspace. Objects are handed around as
/// `Arc<Object>`; the shared small-integer pool relies on that to guarantee
/// a single instance per pooled value, so an object is never mutated in
/// place. Operations that change a payload return a replacement object.
#[derive(Debug)]
pub struct Object {
    pub value: Value,
    lru: AtomicU32,
}

impl Object {
    fn new(value: Value) -> Object {
        Object {
            value,
            lru: AtomicU32::new(0),
        }
    }

    pub(crate) fn raw_int(i: i64) -> Object {
        Object::new(Value::Str(Str::Int(i)))
    }

    /// Wrap raw bytes, promoting to the integer encoding (and the shared
    /// pool) when the content is a canonical decimal integer.
    pub fn from_bytes(bytes: Bytes, shared: &Shared) -> Arc<Object> {
        Object::encode(Arc::new(Object::new(Value::Str(Str::Raw(bytes)))), shared)
    }

    /// Wrap an integer, substituting the shared instance for pooled values.
    pub fn from_int(i: i64, shared: &Shared) -> Arc<Object> {
        match shared.integer(i) {
            Some(obj) => obj,
            None => Arc::new(Object::raw_int(i)),
        }
    }

    /// Attempt the raw → int promotion. Raw objects whose bytes are the
    /// canonical decimal form of an i64 become int-encoded; pooled values
    /// are replaced by the shared instance. Anything else passes through.
    pub fn encode(this: Arc<Object>, shared: &Shared) -> Arc<Object> {
        let Value::Str(Str::Raw(ref bytes)) = this.value else {
            return this;
        };
        match parse_decimal(bytes) {
            Some(i) => Object::from_int(i, shared),
            None => this,
        }
    }

    /// Get a decoded version of an encoded object, as a new raw object.
    /// Already-raw objects are returned as-is.
    pub fn decode(this: Arc<Object>) -> Arc<Object> {
        match this.value {
            Value::Str(Str::Int(i)) => Arc::new(Object::new(Value::Str(Str::Raw(Bytes::from(
                i.to_string(),
            ))))),
            Value::Str(Str::Raw(_)) => this,
        }
    }

    /// Concatenate `tail` onto the object, demoting an int encoding to its
    /// decimal form first, then re-attempt promotion. Returns the
    /// replacement object and the resulting payload length.
    pub fn append(this: &Arc<Object>, tail: &[u8], shared: &Shared) -> (Arc<Object>, usize) {
        if tail.is_empty() {
            return (this.clone(), this.len());
        }
        let mut buf = BytesMut::new();
        match this.value {
            Value::Str(Str::Raw(ref bytes)) => buf.extend_from_slice(bytes),
            Value::Str(Str::Int(i)) => buf.put_slice(i.to_string().as_bytes()),
        }
        buf.extend_from_slice(tail);
        let len = buf.len();
        (Object::from_bytes(buf.freeze(), shared), len)
    }

    pub fn kind(&self) -> ObjectKind {
        match self.value {
            Value::Str(_) => ObjectKind::Str,
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self.value {
            Value::Str(Str::Int(_)) => Encoding::Int,
            Value::Str(Str::Raw(_)) => Encoding::Raw,
        }
    }

    /// The payload as bytes, materializing the decimal form of an
    /// int-encoded object.
    pub fn to_bytes(&self) -> Bytes {
        match self.value {
            Value::Str(Str::Raw(ref bytes)) => bytes.clone(),
            Value::Str(Str::Int(i)) => Bytes::from(i.to_string()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            Value::Str(Str::Int(i)) => Some(i),
            Value::Str(Str::Raw(ref bytes)) => parse_decimal(bytes),
        }
    }

    /// Byte length of the payload; the decimal length for int encoding.
    pub fn len(&self) -> usize {
        match self.value {
            Value::Str(Str::Raw(ref bytes)) => bytes.len(),
            Value::Str(Str::Int(i)) => decimal_len(i),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stamp the coarse LRU clock maintained by the server cron.
    pub fn touch(&self, lru_clock: u32) {
        self.lru.store(lru_clock, Ordering::Relaxed);
    }

    pub fn lru(&self) -> u32 {
        self.lru.load(Ordering::Relaxed)
    }
}

/// Parse bytes as an i64, accepting only the canonical decimal form:
/// `"012"`, `"+5"` and `" 7"` all stay raw.
pub fn parse_decimal(bytes: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(bytes).ok()?;
    let i = s.parse::<i64>().ok()?;
    if i.to_string() == s {
        Some(i)
    } else {
        None
    }
}

fn decimal_len(i: i64) -> usize {
    // i64::MAX is 19 digits; itoa-free since this is off the hot path.
    i.to_string().len()
}

/// Signed-overflow guard used by INCRBY and DECRBY.
pub fn checked_incr(value: i64, incr: i64) -> Option<i64> {
    value.checked_add(incr)
}
