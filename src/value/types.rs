use std::{collections::BTreeMap, fmt};

use super::Value;

/// Declared type of a function argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSignature {
    UInt,
    Int,
    Bool,
    Principal,
    Buffer(u32),
    StringAscii(u32),
    StringUtf8(u32),
    Optional(Box<TypeSignature>),
    Response(Box<TypeSignature>, Box<TypeSignature>),
    List(Box<TypeSignature>, u32),
    Tuple(BTreeMap<String, TypeSignature>),
}

impl TypeSignature {
    pub fn optional(inner: TypeSignature) -> Self {
        TypeSignature::Optional(Box::new(inner))
    }

    pub fn response(ok: TypeSignature, err: TypeSignature) -> Self {
        TypeSignature::Response(Box::new(ok), Box::new(err))
    }

    pub fn list(item: TypeSignature, max_len: u32) -> Self {
        TypeSignature::List(Box::new(item), max_len)
    }

    pub fn tuple<K: Into<String>>(fields: impl IntoIterator<Item = (K, TypeSignature)>) -> Self {
        TypeSignature::Tuple(fields.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (TypeSignature::UInt, Value::UInt(_))
            | (TypeSignature::Int, Value::Int(_))
            | (TypeSignature::Bool, Value::Bool(_))
            | (TypeSignature::Principal, Value::Principal(_)) => true,
            (TypeSignature::Buffer(max), Value::Buffer(bytes)) => fits(bytes.len(), *max),
            (TypeSignature::StringAscii(max), Value::StringAscii(s)) => fits(s.len(), *max),
            (TypeSignature::StringUtf8(max), Value::StringUtf8(s)) => {
                fits(s.chars().count(), *max)
            }
            (TypeSignature::Optional(_), Value::Optional(None)) => true,
            (TypeSignature::Optional(inner), Value::Optional(Some(v))) => inner.admits(v),
            (TypeSignature::Response(ok, _), Value::Response(Ok(v))) => ok.admits(v),
            (TypeSignature::Response(_, err), Value::Response(Err(v))) => err.admits(v),
            (TypeSignature::List(item, max), Value::List(items)) => {
                fits(items.len(), *max) && items.iter().all(|v| item.admits(v))
            }
            (TypeSignature::Tuple(fields), Value::Tuple(values)) => {
                fields.len() == values.len()
                    && fields.iter().all(|(name, ty)| {
                        values.get(name).is_some_and(|v| ty.admits(v))
                    })
            }
            _ => false,
        }
    }
}

fn fits(len: usize, max: u32) -> bool {
    u32::try_from(len).is_ok_and(|len| len <= max)
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::UInt => f.write_str("uint"),
            TypeSignature::Int => f.write_str("int"),
            TypeSignature::Bool => f.write_str("bool"),
            TypeSignature::Principal => f.write_str("principal"),
            TypeSignature::Buffer(max) => write!(f, "(buff {max})"),
            TypeSignature::StringAscii(max) => write!(f, "(string-ascii {max})"),
            TypeSignature::StringUtf8(max) => write!(f, "(string-utf8 {max})"),
            TypeSignature::Optional(inner) => write!(f, "(optional {inner})"),
            TypeSignature::Response(ok, err) => write!(f, "(response {ok} {err})"),
            TypeSignature::List(item, max) => write!(f, "(list {max} {item})"),
            TypeSignature::Tuple(fields) => {
                f.write_str("{")?;
                for (idx, (name, ty)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_match_their_kind_only() {
        assert!(TypeSignature::UInt.admits(&Value::uint(1)));
        assert!(!TypeSignature::UInt.admits(&Value::int(1)));
        assert!(!TypeSignature::Bool.admits(&Value::uint(0)));
    }

    #[test]
    fn length_limits_are_enforced() {
        let memo = TypeSignature::optional(TypeSignature::Buffer(34));
        assert!(memo.admits(&Value::none()));
        assert!(memo.admits(&Value::some(Value::buffer(vec![0; 34]))));
        assert!(!memo.admits(&Value::some(Value::buffer(vec![0; 35]))));

        let name = TypeSignature::StringUtf8(2);
        assert!(name.admits(&Value::string_utf8("éé")));
        assert!(!name.admits(&Value::string_utf8("abc")));

        let amounts = TypeSignature::list(TypeSignature::UInt, 2);
        assert!(amounts.admits(&Value::list(vec![])));
        assert!(!amounts.admits(&Value::list(vec![Value::uint(1); 3])));
        assert!(!amounts.admits(&Value::list(vec![Value::bool(true)])));
    }

    #[test]
    fn tuples_need_exact_fields() {
        let ty = TypeSignature::tuple([("a", TypeSignature::UInt), ("b", TypeSignature::Bool)]);
        assert!(ty.admits(&Value::tuple([("a", Value::uint(1)), ("b", Value::bool(true))])));
        assert!(!ty.admits(&Value::tuple([("a", Value::uint(1))])));
        assert!(!ty.admits(&Value::tuple([("a", Value::uint(1)), ("c", Value::bool(true))])));
    }

    #[test]
    fn responses_check_the_active_branch() {
        let ty = TypeSignature::response(TypeSignature::Bool, TypeSignature::UInt);
        assert!(ty.admits(&Value::ok(Value::bool(true))));
        assert!(ty.admits(&Value::err(Value::uint(4))));
        assert!(!ty.admits(&Value::err(Value::bool(true))));
    }

    #[test]
    fn renders_type_names() {
        let ty = TypeSignature::optional(TypeSignature::Buffer(34));
        assert_eq!(ty.to_string(), "(optional (buff 34))");
        assert_eq!(
            TypeSignature::list(TypeSignature::Principal, 10).to_string(),
            "(list 10 principal)"
        );
    }
}
