//! Embedded script payload extraction.
//!
//! The embed document sometimes inlines the full post JSON as a string
//! literal inside a `TimeSliceImpl` script line. The line is tokenized just far
//! enough to find string literals, the literal mentioning `shortcode_media` is
//! unescaped, and the result is parsed as JSON.

use embedfix_core::Error;
use serde_json::Value;

use super::marker::{MarkerScanner, TIME_SLICE_MARKER};

/// Substring identifying the literal that carries the post JSON.
const PAYLOAD_NEEDLE: &[u8] = b"shortcode_media";

/// Extract the `gql_data` object from an embedded script payload.
///
/// Returns `Ok(None)` when the body has no marker line or no matching
/// literal, and `Err(Error::Parse)` when a payload is present but malformed.
pub fn extract_embedded_script(body: &[u8]) -> Result<Option<Value>, Error> {
    let scanner = MarkerScanner::new(TIME_SLICE_MARKER);
    let Some(hit) = scanner.last_match(body) else {
        return Ok(None);
    };

    // A quoted marker leaves its closing quote at the start of the payload.
    let mut payload = hit.payload();
    if let Some(quote) = hit.opening_quote()
        && payload.first() == Some(&quote)
    {
        payload = &payload[1..];
    }

    let Some(literal) = StringLiterals::new(payload).find(|lit| contains(lit, PAYLOAD_NEEDLE)) else {
        return Ok(None);
    };

    let inner = &literal[1..literal.len() - 1];
    let json = unescape(inner)?;
    let value: Value =
        serde_json::from_str(&json).map_err(|e| Error::Parse(format!("embedded script payload is not JSON: {e}")))?;

    match value.get("gql_data") {
        Some(data) if !data.is_null() => Ok(Some(data.clone())),
        _ => Err(Error::Parse("embedded script payload has no gql_data".into())),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    /// Inside a literal opened by `quote` at byte `start`.
    Literal { quote: u8, start: usize },
    Escape { quote: u8, start: usize },
    LineComment,
    BlockComment,
}

/// Iterator over the string literals of a script fragment.
///
/// Each item is the raw literal including its quotes. An unterminated literal
/// ends the stream.
pub struct StringLiterals<'a> {
    src: &'a [u8],
    pos: usize,
    state: State,
}

impl<'a> StringLiterals<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0, state: State::Code }
    }
}

impl<'a> Iterator for StringLiterals<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.src.len() {
            let i = self.pos;
            let byte = self.src[i];
            self.pos += 1;

            self.state = match self.state {
                State::Code => match byte {
                    b'"' | b'\'' | b'`' => State::Literal { quote: byte, start: i },
                    b'/' if self.src.get(i + 1) == Some(&b'/') => {
                        self.pos += 1;
                        State::LineComment
                    }
                    b'/' if self.src.get(i + 1) == Some(&b'*') => {
                        self.pos += 1;
                        State::BlockComment
                    }
                    _ => State::Code,
                },
                State::Literal { quote, start } => match byte {
                    b'\\' => State::Escape { quote, start },
                    b if b == quote => {
                        self.state = State::Code;
                        return Some(&self.src[start..=i]);
                    }
                    _ => State::Literal { quote, start },
                },
                State::Escape { quote, start } => State::Literal { quote, start },
                State::LineComment => match byte {
                    b'\n' => State::Code,
                    _ => State::LineComment,
                },
                State::BlockComment => {
                    if byte == b'*' && self.src.get(i + 1) == Some(&b'/') {
                        self.pos += 1;
                        State::Code
                    } else {
                        State::BlockComment
                    }
                }
            };
        }
        None
    }
}

/// Decode the escape sequences of a script string literal body.
///
/// Handles `\n`-style control escapes, `\xHH`, `\uHHHH` (with surrogate
/// pairs), `\u{H..}`, line continuations, and identity escapes such as `\"`.
/// Unpaired surrogates decode to U+FFFD.
pub fn unescape(raw: &[u8]) -> Result<String, Error> {
    let text = std::str::from_utf8(raw).map_err(|e| Error::Parse(format!("script literal is not UTF-8: {e}")))?;
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            return Err(Error::Parse("dangling backslash in script literal".into()));
        };
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'v' => out.push('\u{0B}'),
            '0' if !chars.peek().is_some_and(char::is_ascii_digit) => out.push('\0'),
            'x' => {
                let code = read_hex(&mut chars, 2)?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'u' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut code = 0u32;
                let mut digits = 0;
                loop {
                    match chars.next() {
                        Some('}') if digits > 0 => break,
                        Some(d) if d.is_ascii_hexdigit() && digits < 6 => {
                            code = code * 16 + d.to_digit(16).unwrap_or(0);
                            digits += 1;
                        }
                        _ => return Err(Error::Parse("malformed \\u{} escape in script literal".into())),
                    }
                }
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'u' => {
                let high = read_hex(&mut chars, 4)?;
                if (0xD800..0xDC00).contains(&high) {
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        let low = read_hex(&mut lookahead, 4)?;
                        if (0xDC00..0xE000).contains(&low) {
                            chars = lookahead;
                            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                            out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                            continue;
                        }
                    }
                    out.push(char::REPLACEMENT_CHARACTER);
                } else {
                    out.push(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }

    Ok(out)
}

fn read_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, len: usize) -> Result<u32, Error> {
    let mut code = 0u32;
    for _ in 0..len {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| Error::Parse("malformed hex escape in script literal".into()))?;
        code = code * 16 + digit;
    }
    Ok(code)
}
