//! Strict parser for the Python literal syntax carried in `waveform_raw`.
//!
//! Only literal values are recognised: mappings, lists, tuples, sets,
//! strings, numbers and the `True`/`False`/`None` constants. Names, calls,
//! attribute access and operators are parse errors, so nothing in an export
//! is ever evaluated.
//!
//! Values land in a [`serde_json::Value`] tree. Tuples and sets become arrays;
//! mapping keys are rendered with [`scalar_text`].

use crate::error::LiteralError;
use serde_json::{Map, Number, Value};

/// Deepest container nesting accepted before the input is rejected.
const MAX_DEPTH: usize = 256;

/// Parse a complete literal. Trailing content other than whitespace or
/// comments is an error.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser::new(input);
    let value = parser.parse_value()?;
    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing content"));
    }
    Ok(value)
}

/// Text form of a scalar value as the exporting side writes it.
///
/// Returns `None` for arrays and mappings.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Null => Some("None".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn rest(&self) -> &'a str {
        let src = self.src;
        &src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{expected}'")))
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError::new(self.pos, message)
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, accept: F) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &src[start..self.pos]
    }

    /// Whitespace, explicit line joins and `#` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\n' | '\r' | '\x0c') => self.pos += 1,
                Some('\\') if self.rest()[1..].starts_with('\n') => self.pos += 2,
                Some('#') => {
                    self.take_while(|c| c != '\n');
                }
                _ => break,
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('{') => self.nested(Self::parse_braces),
            Some('[') => self.nested(Self::parse_list),
            Some('(') => self.nested(Self::parse_parens),
            Some('\'' | '"') => self.parse_strings(),
            Some('+' | '-') => self.parse_signed_number(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(false),
            Some(c) if c.is_alphabetic() || c == '_' => {
                if self.string_start().is_some() {
                    self.parse_strings()
                } else {
                    self.parse_name()
                }
            }
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    fn nested<F>(&mut self, parse: F) -> Result<Value, LiteralError>
    where
        F: FnOnce(&mut Self) -> Result<Value, LiteralError>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Comma separated values up to and including `close`.
    fn parse_sequence(&mut self, close: char) -> Result<Vec<Value>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            if self.eat(close) {
                return Ok(items);
            }
            if !self.eat(',') {
                return Err(self.error(format!("expected ',' or '{close}'")));
            }
        }
    }

    fn parse_list(&mut self) -> Result<Value, LiteralError> {
        self.expect('[')?;
        Ok(Value::Array(self.parse_sequence(']')?))
    }

    fn parse_parens(&mut self) -> Result<Value, LiteralError> {
        self.expect('(')?;
        self.skip_trivia();
        if self.eat(')') {
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.parse_value()?;
        self.skip_trivia();
        // `(x)` is grouping, `(x,)` is a tuple
        if self.eat(')') {
            return Ok(first);
        }
        if !self.eat(',') {
            return Err(self.error("expected ',' or ')'"));
        }
        let mut items = vec![first];
        items.extend(self.parse_sequence(')')?);
        Ok(Value::Array(items))
    }

    fn parse_braces(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        self.skip_trivia();
        if self.eat('}') {
            return Ok(Value::Object(Map::new()));
        }

        let key_start = self.pos;
        let first = self.parse_value()?;
        self.skip_trivia();
        if self.eat(':') {
            let mut map = Map::new();
            let value = self.parse_value()?;
            map.insert(mapping_key(&first, key_start)?, value);
            loop {
                self.skip_trivia();
                if self.eat('}') {
                    return Ok(Value::Object(map));
                }
                if !self.eat(',') {
                    return Err(self.error("expected ',' or '}'"));
                }
                self.skip_trivia();
                if self.eat('}') {
                    return Ok(Value::Object(map));
                }
                let key_start = self.pos;
                let key = self.parse_value()?;
                let key = mapping_key(&key, key_start)?;
                self.skip_trivia();
                self.expect(':')?;
                let value = self.parse_value()?;
                map.insert(key, value);
            }
        }

        // Set display
        let mut elements = vec![first];
        if !self.eat('}') {
            if !self.eat(',') {
                return Err(self.error("expected ',', ':' or '}'"));
            }
            elements.extend(self.parse_sequence('}')?);
        }
        let mut items: Vec<Value> = Vec::with_capacity(elements.len());
        for element in elements {
            if scalar_text(&element).is_none() {
                return Err(LiteralError::new(key_start, "unhashable set element"));
            }
            if !items.contains(&element) {
                items.push(element);
            }
        }
        Ok(Value::Array(items))
    }

    /// Prefix length and rawness when a string literal starts here.
    fn string_start(&self) -> Option<(usize, bool)> {
        let mut chars = self.rest().chars();
        match chars.next()? {
            '\'' | '"' => Some((0, false)),
            'u' | 'U' => matches!(chars.next(), Some('\'' | '"')).then_some((1, false)),
            'r' | 'R' => matches!(chars.next(), Some('\'' | '"')).then_some((1, true)),
            _ => None,
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self) -> Result<Value, LiteralError> {
        let mut text = String::new();
        while let Some((prefix_len, raw)) = self.string_start() {
            self.pos += prefix_len;
            self.parse_quoted(raw, &mut text)?;
            self.skip_trivia();
        }
        Ok(Value::String(text))
    }

    fn parse_quoted(&mut self, raw: bool, out: &mut String) -> Result<(), LiteralError> {
        let start = self.pos;
        let unterminated = || LiteralError::new(start, "unterminated string");
        let quote = self.bump().ok_or_else(unterminated)?;
        let triple_tail = if quote == '"' { "\"\"" } else { "''" };
        let triple = self.rest().starts_with(triple_tail);
        if triple {
            self.pos += 2;
        }

        loop {
            let c = self.bump().ok_or_else(unterminated)?;
            if c == quote {
                if !triple {
                    return Ok(());
                }
                if self.rest().starts_with(triple_tail) {
                    self.pos += 2;
                    return Ok(());
                }
                out.push(c);
                continue;
            }
            if (c == '\n' || c == '\r') && !triple {
                return Err(unterminated());
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            if raw {
                // Raw strings keep the backslash, which still shields a quote.
                out.push('\\');
                out.push(self.bump().ok_or_else(unterminated)?);
                continue;
            }
            self.parse_escape(out)?;
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let escape_start = self.pos - 1;
        let c = self
            .bump()
            .ok_or_else(|| LiteralError::new(escape_start, "unterminated string"))?;
        match c {
            '\n' => {}
            '\r' => {
                self.eat('\n');
            }
            '\\' | '\'' | '"' => out.push(c),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0b}'),
            'x' => out.push(self.hex_escape(2, escape_start)?),
            'u' => out.push(self.hex_escape(4, escape_start)?),
            'U' => out.push(self.hex_escape(8, escape_start)?),
            '0'..='7' => {
                let mut code = c as u32 - '0' as u32;
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ '0'..='7') => {
                            code = code * 8 + (d as u32 - '0' as u32);
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                let decoded = char::from_u32(code)
                    .ok_or_else(|| LiteralError::new(escape_start, "invalid octal escape"))?;
                out.push(decoded);
            }
            'N' => {
                return Err(LiteralError::new(
                    escape_start,
                    "named unicode escapes are not supported",
                ))
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize, escape_start: usize) -> Result<char, LiteralError> {
        let end = self.pos + digits;
        let truncated = || LiteralError::new(escape_start, "truncated hex escape");
        let hex = self
            .src
            .get(self.pos..end)
            .filter(|h| h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(truncated)?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| truncated())?;
        self.pos = end;
        char::from_u32(code)
            .ok_or_else(|| LiteralError::new(escape_start, "invalid unicode escape"))
    }

    fn parse_signed_number(&mut self) -> Result<Value, LiteralError> {
        let negative = self.bump() == Some('-');
        self.skip_trivia();
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(negative),
            _ => Err(self.error("a sign must be followed by a number")),
        }
    }

    fn parse_number(&mut self, negative: bool) -> Result<Value, LiteralError> {
        let start = self.pos;
        let invalid = |token: &str| LiteralError::new(start, format!("invalid numeric literal '{token}'"));

        let bytes = self.rest().as_bytes();
        if bytes.len() > 1 && bytes[0] == b'0' {
            let radix = match bytes[1] {
                b'x' | b'X' => Some(16),
                b'o' | b'O' => Some(8),
                b'b' | b'B' => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                let cleaned = strip_underscores(digits).ok_or_else(|| invalid(digits))?;
                let magnitude = u64::from_str_radix(&cleaned, radix).map_err(|_| invalid(digits))?;
                return integer_value(magnitude, negative, start);
            }
        }

        let mut end = 0;
        let mut is_float = false;
        while end < bytes.len() {
            match bytes[end] {
                b'0'..=b'9' | b'_' => end += 1,
                b'.' => {
                    is_float = true;
                    end += 1;
                }
                b'e' | b'E' => {
                    is_float = true;
                    end += 1;
                    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
                        end += 1;
                    }
                }
                _ => break,
            }
        }
        let src = self.src;
        let token = &src[start..start + end];
        self.pos = start + end;

        // Complex numbers and names glued to digits
        if matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            return Err(invalid(token));
        }

        let cleaned = strip_underscores(token).ok_or_else(|| invalid(token))?;
        if is_float {
            let value: f64 = cleaned.parse().map_err(|_| invalid(token))?;
            let value = if negative { -value } else { value };
            return Number::from_f64(value)
                .map(Value::Number)
                .ok_or_else(|| LiteralError::new(start, "float literal is not finite"));
        }

        if cleaned.len() > 1 && cleaned.starts_with('0') && cleaned.bytes().any(|b| b != b'0') {
            return Err(LiteralError::new(
                start,
                "leading zeros are not permitted in decimal integers",
            ));
        }
        let magnitude: u64 = cleaned
            .parse()
            .map_err(|_| LiteralError::new(start, "integer literal out of range"))?;
        integer_value(magnitude, negative, start)
    }

    fn parse_name(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
        match name {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ if matches!(self.peek(), Some('\'' | '"')) => Err(LiteralError::new(
                start,
                format!("unsupported string prefix '{name}'"),
            )),
            _ => Err(LiteralError::new(
                start,
                format!("name '{name}' is not a literal"),
            )),
        }
    }
}

fn mapping_key(key: &Value, offset: usize) -> Result<String, LiteralError> {
    scalar_text(key).ok_or_else(|| LiteralError::new(offset, "unsupported mapping key"))
}

/// Digit groups may be separated by single underscores.
fn strip_underscores(token: &str) -> Option<String> {
    if token.starts_with('_') || token.ends_with('_') || token.contains("__") {
        return None;
    }
    Some(token.replace('_', ""))
}

fn integer_value(magnitude: u64, negative: bool, offset: usize) -> Result<Value, LiteralError> {
    if !negative {
        return Ok(Value::Number(Number::from(magnitude)));
    }
    if magnitude == i64::MIN.unsigned_abs() {
        return Ok(Value::Number(Number::from(i64::MIN)));
    }
    let value = i64::try_from(magnitude)
        .map_err(|_| LiteralError::new(offset, "integer literal out of range"))?;
    Ok(Value::Number(Number::from(-value)))
}
