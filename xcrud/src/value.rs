//! Scalar values and the [`Encode`] trait.
use bytes::Bytes;
use std::fmt;

use crate::ext::FmtExt;

/// A single scalar sent to the server.
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Bytes),
}

impl Value {
    /// Returns `true` if value is `NULL`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::Int(i) => f.write_str(itoa::Buffer::new().format(*i)),
            Self::UInt(u) => f.write_str(itoa::Buffer::new().format(*u)),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "{:?}", b.lossy()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Value that can be encoded to be sent as a literal or bound to a parameter.
pub trait Encode {
    fn encode(self) -> Value;
}

impl Encode for Value {
    fn encode(self) -> Value {
        self
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(self) -> Value {
        match self {
            Some(v) => v.encode(),
            None => Value::Null,
        }
    }
}

macro_rules! encode {
    ($($ty:ty => $variant:ident as $as:ty),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode(self) -> Value {
                    Value::$variant(self as $as)
                }
            }
        )*
    };
}

encode! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f32,
    f64 => Double as f64,
}

impl Encode for bool {
    fn encode(self) -> Value {
        Value::Bool(self)
    }
}

impl Encode for &str {
    fn encode(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl Encode for String {
    fn encode(self) -> Value {
        Value::String(self)
    }
}

impl Encode for &String {
    fn encode(self) -> Value {
        Value::String(self.clone())
    }
}

impl Encode for Bytes {
    fn encode(self) -> Value {
        Value::Bytes(self)
    }
}

impl Encode for Vec<u8> {
    fn encode(self) -> Value {
        Value::Bytes(self.into())
    }
}

impl Encode for &[u8] {
    fn encode(self) -> Value {
        Value::Bytes(Bytes::copy_from_slice(self))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_scalars() {
        assert_eq!(7i32.encode(), Value::Int(7));
        assert_eq!(7u8.encode(), Value::UInt(7));
        assert_eq!("a".encode(), Value::String("a".into()));
        assert_eq!(None::<i32>.encode(), Value::Null);
        assert_eq!(Some(true).encode(), Value::Bool(true));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::String("x\"y".into()).to_string(), "\"x\\\"y\"");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
