//! Typed values exchanged across the call boundary.
//!
//! [`Value`] is the closed set of kinds a contract function accepts and
//! returns. Values are immutable and compare structurally; the derived `Ord`
//! lets them key contract data maps. The textual form produced by `Display`
//! is accepted back by the parser in [`parse`].

mod parse;
mod types;

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

pub use parse::ValueError;
pub use types::TypeSignature;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Value {
    UInt(u128),
    Int(i128),
    Bool(bool),
    Principal(Principal),
    Optional(Option<Box<Value>>),
    Response(Result<Box<Value>, Box<Value>>),
    Buffer(Vec<u8>),
    StringAscii(String),
    StringUtf8(String),
    List(Vec<Value>),
    Tuple(BTreeMap<String, Value>),
}

impl Value {
    pub fn uint(n: u128) -> Self {
        Value::UInt(n)
    }

    pub fn int(n: i128) -> Self {
        Value::Int(n)
    }

    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    pub fn principal(p: Principal) -> Self {
        Value::Principal(p)
    }

    pub fn none() -> Self {
        Value::Optional(None)
    }

    pub fn some(v: Value) -> Self {
        Value::Optional(Some(Box::new(v)))
    }

    pub fn ok(v: Value) -> Self {
        Value::Response(Ok(Box::new(v)))
    }

    pub fn err(v: Value) -> Self {
        Value::Response(Err(Box::new(v)))
    }

    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Buffer(bytes.into())
    }

    /// Fails when `s` contains non-ASCII characters.
    pub fn string_ascii(s: &str) -> Result<Self, ValueError> {
        if !s.is_ascii() {
            return Err(ValueError::NonAscii(s.to_string()));
        }
        Ok(Value::StringAscii(s.to_string()))
    }

    pub fn string_utf8(s: &str) -> Self {
        Value::StringUtf8(s.to_string())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(items)
    }

    pub fn tuple<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Tuple(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Value::UInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_principal(&self) -> Option<&Principal> {
        match self {
            Value::Principal(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            Value::Buffer(b) => Some(b),
            _ => None,
        }
    }

    /// `Some(inner)` for an optional value, `None` for anything else.
    pub fn as_optional(&self) -> Option<Option<&Value>> {
        match self {
            Value::Optional(inner) => Some(inner.as_deref()),
            _ => None,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Value::Response(_))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Value::Response(Ok(_)))
    }

    pub fn is_err(&self) -> bool {
        matches!(self, Value::Response(Err(_)))
    }

    pub fn ok_value(&self) -> Option<&Value> {
        match self {
            Value::Response(Ok(v)) => Some(v),
            _ => None,
        }
    }

    pub fn err_value(&self) -> Option<&Value> {
        match self {
            Value::Response(Err(v)) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::UInt(n) => write!(f, "u{n}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Principal(p) => write!(f, "'{p}"),
            Value::Optional(None) => f.write_str("none"),
            Value::Optional(Some(v)) => write!(f, "(some {v})"),
            Value::Response(Ok(v)) => write!(f, "(ok {v})"),
            Value::Response(Err(v)) => write!(f, "(err {v})"),
            Value::Buffer(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Value::StringAscii(s) => write_quoted(f, s),
            Value::StringUtf8(s) => {
                f.write_str("u")?;
                write_quoted(f, s)
            }
            Value::List(items) => {
                f.write_str("(list")?;
                for item in items {
                    write!(f, " {item}")?;
                }
                f.write_str(")")
            }
            Value::Tuple(fields) => {
                f.write_str("{")?;
                for (idx, (name, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl FromStr for Value {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_value(s)
    }
}

impl TryFrom<String> for Value {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Value> for String {
    fn from(v: Value) -> Self {
        v.to_string()
    }
}

impl From<Principal> for Value {
    fn from(p: Principal) -> Self {
        Value::Principal(p)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Hex encoding for raw byte fields in serialized events.
pub(crate) mod serde_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployer() -> Principal {
        Principal::standard("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM").unwrap()
    }

    #[test]
    fn renders_canonical_form() {
        assert_eq!(Value::uint(1000).to_string(), "u1000");
        assert_eq!(Value::int(-5).to_string(), "-5");
        assert_eq!(Value::err(Value::uint(6)).to_string(), "(err u6)");
        assert_eq!(Value::some(Value::bool(true)).to_string(), "(some true)");
        assert_eq!(Value::none().to_string(), "none");
        assert_eq!(Value::buffer(vec![0xde, 0xad]).to_string(), "0xdead");
        assert_eq!(
            Value::string_ascii("Stacks Token").unwrap().to_string(),
            "\"Stacks Token\""
        );
        assert_eq!(Value::string_utf8("hé").to_string(), "u\"hé\"");
        assert_eq!(
            Value::list(vec![Value::uint(1), Value::uint(2)]).to_string(),
            "(list u1 u2)"
        );
        assert_eq!(
            Value::principal(deployer()).to_string(),
            "'ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"
        );
        let tuple = Value::tuple([("b", Value::bool(false)), ("a", Value::uint(1))]);
        assert_eq!(tuple.to_string(), "{a: u1, b: false}");
    }

    #[test]
    fn structural_equality_and_ordering() {
        assert_eq!(Value::ok(Value::uint(1)), Value::ok(Value::uint(1)));
        assert_ne!(Value::ok(Value::uint(1)), Value::err(Value::uint(1)));
        assert!(Value::uint(1) < Value::uint(2));
        assert_ne!(
            Value::string_ascii("a").unwrap(),
            Value::string_utf8("a")
        );
    }

    #[test]
    fn string_ascii_rejects_non_ascii() {
        assert!(matches!(
            Value::string_ascii("é"),
            Err(ValueError::NonAscii(_))
        ));
    }

    #[test]
    fn accessors() {
        let v = Value::ok(Value::uint(9));
        assert!(v.is_ok());
        assert!(v.is_response());
        assert_eq!(v.ok_value().and_then(Value::as_uint), Some(9));
        assert_eq!(v.err_value(), None);
        assert_eq!(Value::none().as_optional(), Some(None));
        assert_eq!(Value::uint(1).as_optional(), None);
    }

    #[test]
    fn serializes_as_rendered_text() {
        let v = Value::err(Value::uint(4));
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"(err u4)\"");
        let back: Value = serde_json::from_str("\"(err u4)\"").unwrap();
        assert_eq!(back, v);
    }
}
