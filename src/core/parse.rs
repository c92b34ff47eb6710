//! Lexer and parser for the record literal syntax: quoted strings, signed
//! numbers, `True`/`False`/`None`, lists, tuples, dicts and sets, exactly as
//! they appear one-per-line in the raw dumps.

use crate::domain::value::Value;
use crate::utils::error::{PrepError, Result};
use indexmap::IndexMap;
use logos::{Logos, Span};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("None")]
    None,

    #[regex(r"[+-]?(?:0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+|[0-9][0-9_]*)")]
    Int,

    #[regex(r"[+-]?(?:[0-9][0-9_]*\.(?:[0-9][0-9_]*)?(?:[eE][+-]?[0-9][0-9_]*)?|\.[0-9][0-9_]*(?:[eE][+-]?[0-9][0-9_]*)?|[0-9][0-9_]*[eE][+-]?[0-9][0-9_]*)")]
    Float,

    // An optional one- or two-letter prefix, then a quoted body where a
    // backslash always escapes the next character.
    #[regex(r#"[a-zA-Z]{0,2}'(?:[^'\\\n]|\\.)*'"#)]
    #[regex(r#"[a-zA-Z]{0,2}"(?:[^"\\\n]|\\.)*""#)]
    Str,
}

type ParseResult<T> = std::result::Result<T, String>;

/// Parses one line of record text into a [`Value`].
///
/// Errors carry the byte offset of the offending token within the line;
/// [`crate::core::reader::RecordReader`] rewrites the line number when it
/// surfaces them.
pub fn parse_literal(input: &str) -> Result<Value> {
    parse_inner(input).map_err(|message| PrepError::ParseError { line: 1, message })
}

impl std::str::FromStr for Value {
    type Err = PrepError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_literal(s)
    }
}

fn parse_inner(input: &str) -> ParseResult<Value> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => return Err(format!("unexpected character at offset {}", span.start)),
        }
    }

    let mut parser = Parser {
        src: input,
        tokens,
        pos: 0,
    };
    if parser.at_end() {
        return Err("empty input".to_string());
    }
    let value = parser.parse_value()?;
    if !parser.at_end() {
        return Err(format!(
            "trailing data after literal at offset {}",
            parser.offset()
        ));
    }
    Ok(value)
}

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<&(Token, Span)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Byte offset of the current token, or the end of input.
    fn offset(&self) -> usize {
        self.peek()
            .map(|(_, span)| span.start)
            .unwrap_or(self.src.len())
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().map(|(t, _)| t == token).unwrap_or(false) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> ParseResult<()> {
        if self.eat(token) {
            Ok(())
        } else if self.at_end() {
            Err(format!("unexpected end of input: expected {}", what))
        } else {
            Err(format!("expected {} at offset {}", what, self.offset()))
        }
    }

    fn parse_value(&mut self) -> ParseResult<Value> {
        let Some((token, span)) = self.peek() else {
            return Err("unexpected end of input: expected a value".to_string());
        };
        let span = span.clone();
        match token {
            Token::None => {
                self.advance();
                Ok(Value::Null)
            }
            Token::True => {
                self.advance();
                Ok(Value::Bool(true))
            }
            Token::False => {
                self.advance();
                Ok(Value::Bool(false))
            }
            Token::Int => {
                self.advance();
                decode_int(&self.src[span.clone()], span.start)
            }
            Token::Float => {
                self.advance();
                decode_float(&self.src[span.clone()], span.start)
            }
            Token::Str => self.parse_string().map(Value::Str),
            Token::BracketOpen => self.parse_list(),
            Token::BraceOpen => self.parse_brace(),
            Token::ParenOpen => self.parse_paren(),
            _ => Err(format!("expected a value at offset {}", span.start)),
        }
    }

    /// One or more adjacent string tokens; adjacent literals concatenate,
    /// which also covers the common triple-quoted spellings.
    fn parse_string(&mut self) -> ParseResult<String> {
        let mut text = String::new();
        while let Some((Token::Str, span)) = self.peek() {
            let span = span.clone();
            self.advance();
            text.push_str(&decode_string(&self.src[span.clone()], span.start)?);
        }
        Ok(text)
    }

    fn parse_list(&mut self) -> ParseResult<Value> {
        self.advance();
        let mut items = Vec::new();
        loop {
            if self.eat(&Token::BracketClose) {
                break;
            }
            items.push(self.parse_value()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::BracketClose, "',' or ']'")?;
            break;
        }
        Ok(Value::List(items))
    }

    /// A brace literal is a dict when a colon follows the first element and
    /// a set otherwise. `{}` is the empty dict; set members are kept in
    /// first-occurrence order with duplicates dropped.
    fn parse_brace(&mut self) -> ParseResult<Value> {
        self.advance();
        if self.eat(&Token::BraceClose) {
            return Ok(Value::Map(IndexMap::new()));
        }

        let first_offset = self.offset();
        let first = self.parse_value()?;

        if self.eat(&Token::Colon) {
            let mut map = IndexMap::new();
            let key = string_key(first, first_offset)?;
            map.insert(key, self.parse_value()?);
            loop {
                if self.eat(&Token::BraceClose) {
                    break;
                }
                self.expect(&Token::Comma, "',' or '}'")?;
                if self.eat(&Token::BraceClose) {
                    break;
                }
                let key_offset = self.offset();
                let key = string_key(self.parse_value()?, key_offset)?;
                self.expect(&Token::Colon, "':'")?;
                // A repeated key keeps its first position but takes the
                // latest value.
                map.insert(key, self.parse_value()?);
            }
            return Ok(Value::Map(map));
        }

        let mut items = vec![first];
        loop {
            if self.eat(&Token::BraceClose) {
                break;
            }
            self.expect(&Token::Comma, "',' or '}'")?;
            if self.eat(&Token::BraceClose) {
                break;
            }
            let item = self.parse_value()?;
            if !items.contains(&item) {
                items.push(item);
            }
        }
        Ok(Value::List(items))
    }

    /// `()` is the empty tuple, `(x)` is just `x`, and `(x,)` and longer
    /// forms are tuples. Tuples come out as lists.
    fn parse_paren(&mut self) -> ParseResult<Value> {
        self.advance();
        if self.eat(&Token::ParenClose) {
            return Ok(Value::List(Vec::new()));
        }

        let first = self.parse_value()?;
        if self.eat(&Token::ParenClose) {
            return Ok(first);
        }
        self.expect(&Token::Comma, "',' or ')'")?;

        let mut items = vec![first];
        loop {
            if self.eat(&Token::ParenClose) {
                break;
            }
            items.push(self.parse_value()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::ParenClose, "',' or ')'")?;
            break;
        }
        Ok(Value::List(items))
    }
}

fn string_key(value: Value, offset: usize) -> ParseResult<String> {
    match value {
        Value::Str(key) => Ok(key),
        other => Err(format!(
            "dict keys must be strings, found {} at offset {}",
            other.type_name(),
            offset
        )),
    }
}

fn decode_int(raw: &str, offset: usize) -> ParseResult<Value> {
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let (radix, digits) = if let Some(rest) = strip_base_prefix(body, "0x", "0X") {
        (16, rest)
    } else if let Some(rest) = strip_base_prefix(body, "0o", "0O") {
        (8, rest)
    } else if let Some(rest) = strip_base_prefix(body, "0b", "0B") {
        (2, rest)
    } else {
        (10, body)
    };

    check_underscores(digits, offset)?;
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err(format!("invalid integer literal at offset {}", offset));
    }

    let magnitude = u64::from_str_radix(&cleaned, radix)
        .map_err(|_| format!("integer literal out of range at offset {}", offset))?;
    let in_range = if negative {
        magnitude <= (i64::MAX as u64) + 1
    } else {
        magnitude <= i64::MAX as u64
    };
    if !in_range {
        return Err(format!("integer literal out of range at offset {}", offset));
    }
    let value = if negative {
        (-(magnitude as i128)) as i64
    } else {
        magnitude as i64
    };
    Ok(Value::Int(value))
}

fn strip_base_prefix<'a>(body: &'a str, lower: &str, upper: &str) -> Option<&'a str> {
    body.strip_prefix(lower).or_else(|| body.strip_prefix(upper))
}

fn check_underscores(digits: &str, offset: usize) -> ParseResult<()> {
    if digits.ends_with('_') || digits.contains("__") {
        return Err(format!(
            "invalid underscore placement in number at offset {}",
            offset
        ));
    }
    Ok(())
}

fn decode_float(raw: &str, offset: usize) -> ParseResult<Value> {
    // Underscores only group digits; one next to a point, exponent marker
    // or sign is malformed.
    let misplaced = raw.contains("__")
        || raw
            .split(|c: char| !c.is_ascii_digit() && c != '_')
            .any(|segment| segment.starts_with('_') || segment.ends_with('_'));
    if misplaced {
        return Err(format!(
            "invalid underscore placement in number at offset {}",
            offset
        ));
    }

    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    let value: f64 = cleaned
        .parse()
        .map_err(|_| format!("invalid float literal at offset {}", offset))?;
    Ok(Value::Float(value))
}

fn decode_string(raw: &str, offset: usize) -> ParseResult<String> {
    let quote_index = raw
        .find(['\'', '"'])
        .ok_or_else(|| format!("malformed string literal at offset {}", offset))?;
    let prefix = &raw[..quote_index];
    let body = &raw[quote_index + 1..raw.len() - 1];

    let raw_mode = match prefix.to_ascii_lowercase().as_str() {
        "" | "u" => false,
        "r" => true,
        "b" | "rb" | "br" => {
            return Err(format!("bytes literals are not supported at offset {}", offset))
        }
        "f" | "rf" | "fr" => {
            return Err(format!("f-strings are not supported at offset {}", offset))
        }
        _ => {
            return Err(format!(
                "invalid string prefix '{}' at offset {}",
                prefix, offset
            ))
        }
    };

    if raw_mode {
        Ok(body.to_string())
    } else {
        unescape(body, offset)
    }
}

fn unescape(body: &str, offset: usize) -> ParseResult<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err(format!("dangling backslash in string at offset {}", offset));
        };
        match escape {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'a' => out.push('\u{0007}'),
            'b' => out.push('\u{0008}'),
            'v' => out.push('\u{000B}'),
            'f' => out.push('\u{000C}'),
            '\n' => {}
            'x' => out.push(hex_escape(&mut chars, 2, 'x', offset)?),
            'u' => out.push(hex_escape(&mut chars, 4, 'u', offset)?),
            'U' => out.push(hex_escape(&mut chars, 8, 'U', offset)?),
            'N' => {
                return Err(format!(
                    "named unicode escapes are not supported at offset {}",
                    offset
                ))
            }
            '0'..='7' => {
                let mut code = escape.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => {
                        return Err(format!(
                            "invalid octal escape in string at offset {}",
                            offset
                        ))
                    }
                }
            }
            // An unrecognized escape keeps both characters.
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn hex_escape(
    chars: &mut Peekable<Chars<'_>>,
    len: usize,
    marker: char,
    offset: usize,
) -> ParseResult<char> {
    let mut code = 0u32;
    for _ in 0..len {
        let Some(digit) = chars.next().and_then(|c| c.to_digit(16)) else {
            return Err(format!(
                "invalid \\{} escape in string at offset {}",
                marker, offset
            ));
        };
        code = code * 16 + digit;
    }
    char::from_u32(code).ok_or_else(|| format!("invalid unicode escape in string at offset {}", offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Value {
        parse_literal(input).unwrap()
    }

    fn parse_err(input: &str) -> String {
        match parse_literal(input).unwrap_err() {
            PrepError::ParseError { message, .. } => message,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse("None"), Value::Null);
        assert_eq!(parse("True"), Value::Bool(true));
        assert_eq!(parse("False"), Value::Bool(false));
    }

    #[test]
    fn test_integers() {
        assert_eq!(parse("0"), Value::Int(0));
        assert_eq!(parse("42"), Value::Int(42));
        assert_eq!(parse("-42"), Value::Int(-42));
        assert_eq!(parse("+42"), Value::Int(42));
        assert_eq!(parse("1_000_000"), Value::Int(1_000_000));
        assert_eq!(parse("0xFF"), Value::Int(255));
        assert_eq!(parse("0x_dead"), Value::Int(0xdead));
        assert_eq!(parse("-0o17"), Value::Int(-15));
        assert_eq!(parse("0b1010"), Value::Int(10));
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(parse("9223372036854775807"), Value::Int(i64::MAX));
        assert_eq!(parse("-9223372036854775808"), Value::Int(i64::MIN));
        assert!(parse_err("9223372036854775808").contains("out of range"));
        assert!(parse_err("-9223372036854775809").contains("out of range"));
    }

    #[test]
    fn test_bad_underscores() {
        assert!(parse_err("1__0").contains("underscore"));
        assert!(parse_err("1_").contains("underscore"));
        assert!(parse_err("1_.5").contains("underscore"));
        assert!(parse_err("1.5e1_").contains("underscore"));
    }

    #[test]
    fn test_floats() {
        assert_eq!(parse("1.5"), Value::Float(1.5));
        assert_eq!(parse("-1.5"), Value::Float(-1.5));
        assert_eq!(parse(".5"), Value::Float(0.5));
        assert_eq!(parse("5."), Value::Float(5.0));
        assert_eq!(parse("1e3"), Value::Float(1000.0));
        assert_eq!(parse("2.5E-2"), Value::Float(0.025));
        assert_eq!(parse("1_0.2_5"), Value::Float(10.25));
        assert_eq!(parse("1e999"), Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_int_and_float_stay_distinct() {
        assert_eq!(parse("1"), Value::Int(1));
        assert_eq!(parse("1.0"), Value::Float(1.0));
        assert_ne!(parse("1"), parse("1.0"));
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse("'hello'"), Value::from("hello"));
        assert_eq!(parse("\"hello\""), Value::from("hello"));
        assert_eq!(parse("''"), Value::from(""));
        assert_eq!(parse("'it\\'s'"), Value::from("it's"));
        assert_eq!(parse("'a\\nb\\tc'"), Value::from("a\nb\tc"));
        assert_eq!(parse("'don\"t'"), Value::from("don\"t"));
        assert_eq!(parse("u'caf\u{e9}'"), Value::from("caf\u{e9}"));
        assert_eq!(parse("U'x'"), Value::from("x"));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(parse(r"'\x41'"), Value::from("A"));
        assert_eq!(parse(r"'\u00e9'"), Value::from("\u{e9}"));
        assert_eq!(parse(r"'\U0001F600'"), Value::from("\u{1F600}"));
        assert_eq!(parse(r"'\101'"), Value::from("A"));
        assert_eq!(parse(r"'\0'"), Value::from("\0"));
        // Unrecognized escapes keep the backslash.
        assert_eq!(parse(r"'\d+'"), Value::from("\\d+"));
    }

    #[test]
    fn test_raw_strings() {
        assert_eq!(parse(r"r'\n'"), Value::from("\\n"));
        assert_eq!(parse(r"R'\x41'"), Value::from("\\x41"));
        assert_eq!(parse(r"r'a\'b'"), Value::from("a\\'b"));
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert_eq!(parse("'a' 'b'"), Value::from("ab"));
        assert_eq!(parse(r"r'\n' '\n'"), Value::from("\\n\n"));
        assert_eq!(parse("'''abc'''"), Value::from("abc"));
        assert_eq!(parse("\"\"\"abc\"\"\""), Value::from("abc"));
    }

    #[test]
    fn test_rejected_string_forms() {
        assert!(parse_err("b'abc'").contains("bytes literals"));
        assert!(parse_err("rb'abc'").contains("bytes literals"));
        assert!(parse_err("f'abc'").contains("f-strings"));
        assert!(parse_err("q'abc'").contains("invalid string prefix"));
        assert!(parse_err(r"'\N{DEGREE SIGN}'").contains("named unicode escapes"));
        assert!(parse_err(r"'\x4'").contains(r"invalid \x escape"));
        assert!(parse_err(r"'\ud800'").contains("invalid unicode escape"));
    }

    #[test]
    fn test_lists() {
        assert_eq!(parse("[]"), Value::List(vec![]));
        assert_eq!(
            parse("[1, 2.5, 'x', None]"),
            Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("x"),
                Value::Null,
            ])
        );
        assert_eq!(
            parse("[[1], [2]]"),
            Value::List(vec![
                Value::List(vec![Value::Int(1)]),
                Value::List(vec![Value::Int(2)]),
            ])
        );
        assert_eq!(parse("[1, 2,]"), parse("[1, 2]"));
    }

    #[test]
    fn test_tuples() {
        assert_eq!(parse("()"), Value::List(vec![]));
        assert_eq!(parse("(5)"), Value::Int(5));
        assert_eq!(parse("(5,)"), Value::List(vec![Value::Int(5)]));
        assert_eq!(
            parse("(1, 'a')"),
            Value::List(vec![Value::Int(1), Value::from("a")])
        );
        assert_eq!(parse("((1, 2))"), parse("(1, 2)"));
    }

    #[test]
    fn test_dicts() {
        assert_eq!(parse("{}"), Value::Map(IndexMap::new()));

        let value = parse("{'b': 1, 'a': {'nested': [1, 2]}, }");
        let map = value.as_map().unwrap();
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["b", "a"],
            "entries keep record order"
        );
        assert_eq!(
            value.get("a").and_then(|a| a.get("nested")),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn test_dict_duplicate_key_takes_last_value() {
        let value = parse("{'a': 1, 'b': 2, 'a': 3}");
        let map = value.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(value.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_dict_keys_must_be_strings() {
        assert!(parse_err("{1: 'a'}").contains("dict keys must be strings"));
    }

    #[test]
    fn test_sets_become_deduped_lists() {
        assert_eq!(
            parse("{3, 1, 3, 2}"),
            Value::List(vec![Value::Int(3), Value::Int(1), Value::Int(2)])
        );
        assert_eq!(parse("{1,}"), Value::List(vec![Value::Int(1)]));
    }

    #[test]
    fn test_error_offsets() {
        assert_eq!(parse_err(""), "empty input");
        assert_eq!(parse_err("   "), "empty input");
        assert_eq!(parse_err("1 2"), "trailing data after literal at offset 2");
        assert_eq!(parse_err("nil"), "unexpected character at offset 0");
        assert_eq!(parse_err("[1, 2"), "unexpected end of input: expected ',' or ']'");
        assert_eq!(parse_err("{'a' 1}"), "expected ',' or '}' at offset 5");
    }

    #[test]
    fn test_unterminated_string_is_rejected() {
        assert!(parse_literal("'abc").is_err());
    }

    #[test]
    fn test_full_record_line() {
        let line = "{'user_id': 'js41637', 'items_count': 1, 'steam_id': '76561198035864385', \
                    'user_url': 'http://steamcommunity.com/id/js41637', 'items': \
                    [{'item_id': '10', 'item_name': 'Counter-Strike', 'playtime_forever': 6, \
                    'playtime_2weeks': 0}]}";
        let value = parse(line);
        assert_eq!(value.get("user_id"), Some(&Value::from("js41637")));
        let items = value.get("items").and_then(Value::as_list).unwrap();
        assert_eq!(items[0].get("item_name"), Some(&Value::from("Counter-Strike")));
    }

    #[test]
    fn test_repr_round_trip() {
        let value = parse("{'a': [1, -2.5, 'it\\'s', None], 'b': {'c': True}}");
        assert_eq!(parse(&value.repr()), value);
    }

    #[test]
    fn test_from_str() {
        let value: Value = "[1, 2]".parse().unwrap();
        assert_eq!(value, Value::List(vec![Value::Int(1), Value::Int(2)]));
    }
}
