use std::collections::BTreeMap;

use crate::principal::Principal;

use super::Value;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("string contains non-ascii characters: {0:?}")]
    NonAscii(String),
}

pub(crate) fn parse_value(input: &str) -> Result<Value, ValueError> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> ValueError {
        ValueError::Parse {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), ValueError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(self.error(format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(format!("expected '{want}', found end of input"))),
        }
    }

    // A run of characters up to whitespace or a closing delimiter.
    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '{' | '}' | ',' | ':') {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn value(&mut self) -> Result<Value, ValueError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("value nested too deeply"));
        }
        let result = self.value_inner();
        self.depth -= 1;
        result
    }

    fn value_inner(&mut self) -> Result<Value, ValueError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('(') => {
                self.bump();
                self.form()
            }
            Some('{') => {
                self.bump();
                self.tuple_literal()
            }
            Some('\'') => {
                self.bump();
                let text = self.word();
                text.parse::<Principal>()
                    .map(Value::Principal)
                    .map_err(|e| self.error(e.to_string()))
            }
            Some('"') => {
                let s = self.quoted()?;
                Value::string_ascii(&s)
            }
            Some('u') if self.rest().starts_with("u\"") => {
                self.bump();
                Ok(Value::StringUtf8(self.quoted()?))
            }
            Some(_) => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Value, ValueError> {
        let start = self.pos;
        let text = self.word();
        if text.is_empty() {
            return Err(self.error("expected a value"));
        }
        match text {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "none" => return Ok(Value::none()),
            _ => {}
        }
        if let Some(hex_digits) = text.strip_prefix("0x") {
            return hex::decode(hex_digits).map(Value::Buffer).map_err(|e| {
                ValueError::Parse {
                    offset: start,
                    message: format!("invalid buffer literal: {e}"),
                }
            });
        }
        if let Some(digits) = text.strip_prefix('u') {
            if digits.starts_with('+') {
                return Err(ValueError::Parse {
                    offset: start,
                    message: format!("invalid uint literal {text:?}"),
                });
            }
            return digits.parse::<u128>().map(Value::UInt).map_err(|_| ValueError::Parse {
                offset: start,
                message: format!("invalid uint literal {text:?}"),
            });
        }
        // Only the canonical form: an optional '-' then digits.
        if text.starts_with('+') {
            return Err(ValueError::Parse {
                offset: start,
                message: format!("unrecognized literal {text:?}"),
            });
        }
        text.parse::<i128>().map(Value::Int).map_err(|_| ValueError::Parse {
            offset: start,
            message: format!("unrecognized literal {text:?}"),
        })
    }

    // Called after the opening '('.
    fn form(&mut self) -> Result<Value, ValueError> {
        self.skip_ws();
        let head = self.word();
        let value = match head {
            "some" => Value::some(self.value()?),
            "ok" => Value::ok(self.value()?),
            "err" => Value::err(self.value()?),
            "list" => {
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    if self.peek() == Some(')') {
                        break;
                    }
                    items.push(self.value()?);
                }
                Value::List(items)
            }
            "tuple" => {
                let mut fields = BTreeMap::new();
                loop {
                    self.skip_ws();
                    if self.peek() == Some(')') {
                        break;
                    }
                    self.expect('(')?;
                    self.skip_ws();
                    let name = self.field_name()?;
                    let value = self.value()?;
                    self.expect(')')?;
                    fields.insert(name, value);
                }
                Value::Tuple(fields)
            }
            other => return Err(self.error(format!("unknown form {other:?}"))),
        };
        self.expect(')')?;
        Ok(value)
    }

    // Called after the opening '{'.
    fn tuple_literal(&mut self) -> Result<Value, ValueError> {
        let mut fields = BTreeMap::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::Tuple(fields));
        }
        loop {
            self.skip_ws();
            let name = self.field_name()?;
            self.expect(':')?;
            let value = self.value()?;
            fields.insert(name, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                _ => return Err(self.error("expected ',' or '}' in tuple")),
            }
        }
        Ok(Value::Tuple(fields))
    }

    fn field_name(&mut self) -> Result<String, ValueError> {
        let name = self.word();
        let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '?' | '!'));
        if !valid {
            return Err(self.error(format!("invalid tuple field name {name:?}")));
        }
        Ok(name.to_string())
    }

    fn quoted(&mut self) -> Result<String, ValueError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    _ => return Err(self.error("invalid escape sequence")),
                },
                Some(c) => out.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5";

    #[test]
    fn parses_scalars() {
        assert_eq!(parse_value("u1000").unwrap(), Value::uint(1000));
        assert_eq!(parse_value("-42").unwrap(), Value::int(-42));
        assert_eq!(parse_value(" true ").unwrap(), Value::bool(true));
        assert_eq!(parse_value("none").unwrap(), Value::none());
        assert_eq!(parse_value("0x00ff").unwrap(), Value::buffer(vec![0, 255]));
        assert_eq!(
            parse_value(&format!("'{WALLET}")).unwrap(),
            Value::principal(WALLET.parse().unwrap())
        );
    }

    #[test]
    fn parses_nested_forms() {
        let v = parse_value("(ok (some (list u1 u2)))").unwrap();
        assert_eq!(
            v,
            Value::ok(Value::some(Value::list(vec![Value::uint(1), Value::uint(2)])))
        );
        let t = parse_value("(tuple (amount u5) (memo none))").unwrap();
        assert_eq!(
            t,
            Value::tuple([("amount", Value::uint(5)), ("memo", Value::none())])
        );
        let braces = parse_value("{amount: u5, memo: none}").unwrap();
        assert_eq!(braces, t);
    }

    #[test]
    fn parses_strings_with_escapes() {
        assert_eq!(
            parse_value(r#""say \"hi\"""#).unwrap(),
            Value::string_ascii("say \"hi\"").unwrap()
        );
        assert_eq!(parse_value("u\"héllo\"").unwrap(), Value::string_utf8("héllo"));
        assert!(matches!(
            parse_value("\"héllo\""),
            Err(ValueError::NonAscii(_))
        ));
    }

    #[test]
    fn rendering_parses_back() {
        let values = vec![
            Value::err(Value::uint(6)),
            Value::tuple([
                ("owner", Value::principal(WALLET.parse().unwrap())),
                ("data", Value::buffer(vec![1, 2, 3])),
                ("label", Value::string_ascii("a \\ b").unwrap()),
            ]),
            Value::list(vec![]),
            Value::some(Value::int(-1)),
        ];
        for value in values {
            assert_eq!(parse_value(&value.to_string()).unwrap(), value);
        }
    }

    #[test]
    fn reports_malformed_input() {
        assert!(parse_value("").is_err());
        assert!(parse_value("(ok u1").is_err());
        assert!(parse_value("u-1").is_err());
        assert!(parse_value("0xabc").is_err());
        assert!(parse_value("(frobnicate u1)").is_err());
        assert!(parse_value("u1 u2").is_err());
        assert!(parse_value(&"(some ".repeat(100)).is_err());
    }

    #[test]
    fn rejects_explicit_plus_sign() {
        assert!(parse_value("u+5").is_err());
        assert!(parse_value("+7").is_err());
        assert_eq!(parse_value("-7").unwrap(), Value::Int(-7));
        assert_eq!(parse_value("u5").unwrap(), Value::UInt(5));
    }
}
