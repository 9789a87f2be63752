use std::fmt;

/// A database value, as read from a cursor.
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    ShortInt(i16),
    Int(i32),
    BigInt(i64),
    Double(f64),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Returns the integer value, widening the smaller integer types.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::ShortInt(inner) => Some(inner.into()),
            Value::Int(inner) => Some(inner.into()),
            Value::BigInt(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<Option<String>> for Value {
    fn from(text: Option<String>) -> Value {
        text.map_or(Value::Null, Value::Text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Value {
        Value::Text(text.to_owned())
    }
}

impl From<i32> for Value {
    fn from(int: i32) -> Value {
        Value::Int(int)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(inner) => inner.fmt(f),
            Value::ShortInt(inner) => inner.fmt(f),
            Value::Int(inner) => inner.fmt(f),
            Value::BigInt(inner) => inner.fmt(f),
            Value::Double(inner) => inner.fmt(f),
            Value::Timestamp(inner) => inner.fmt(f),
            Value::Text(inner) => inner.fmt(f),
            Value::Blob(inner) => write!(f, "<bytes ({})>", inner.len()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(inner) => inner.fmt(f),
            Value::ShortInt(inner) => inner.fmt(f),
            Value::Int(inner) => inner.fmt(f),
            Value::BigInt(inner) => inner.fmt(f),
            Value::Double(inner) => inner.fmt(f),
            Value::Timestamp(inner) => write!(f, "ts({inner})"),
            Value::Text(inner) => inner.fmt(f),
            Value::Blob(_) => f.write_str("<blob>"),
        }
    }
}
