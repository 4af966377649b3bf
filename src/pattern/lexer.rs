use std::fmt;

use crate::error::{Result, ScoopError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Literal(u8),
    Wildcard,
    Concat,
    Alternate,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
    GroupOpen,
    GroupClose,
}

impl Token {
    #[inline]
    pub fn is_unary(&self) -> bool {
        matches!(self, Token::ZeroOrOne | Token::ZeroOrMore | Token::OneOrMore)
    }

    #[inline]
    pub fn is_operator(&self) -> bool {
        self.is_unary() || matches!(self, Token::Concat | Token::Alternate)
    }

    /// Unary quantifiers bind tightest, then concatenation, then alternation.
    /// Groups are handled structurally and have no precedence.
    pub fn precedence(&self) -> u8 {
        match self {
            Token::ZeroOrOne | Token::ZeroOrMore | Token::OneOrMore => 3,
            Token::Concat => 2,
            Token::Alternate => 1,
            _ => 0,
        }
    }

    /// True for tokens after which an operand is complete.
    #[inline]
    pub(crate) fn ends_operand(&self) -> bool {
        matches!(self, Token::Literal(_) | Token::Wildcard | Token::GroupClose) || self.is_unary()
    }

    /// True for tokens that begin a new operand.
    #[inline]
    pub(crate) fn starts_operand(&self) -> bool {
        matches!(self, Token::Literal(_) | Token::Wildcard | Token::GroupOpen)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(b) => write!(f, "\\x{:02x}", b),
            Token::Wildcard => f.write_str("."),
            Token::Concat => f.write_str("'"),
            Token::Alternate => f.write_str("|"),
            Token::ZeroOrOne => f.write_str("?"),
            Token::ZeroOrMore => f.write_str("*"),
            Token::OneOrMore => f.write_str("+"),
            Token::GroupOpen => f.write_str("("),
            Token::GroupClose => f.write_str(")"),
        }
    }
}

/// Renders a token stream back to pattern notation, with `'` for explicit
/// concatenation.
pub fn tokens_to_string(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.to_string()).collect()
}

/// Splits a signature pattern into tokens.
///
/// `\xHH` is a hex byte, `.` the any-byte wildcard, `()|*+?` are structural,
/// and every other ASCII character stands for its own byte value.
pub fn tokenize(pattern: &str) -> Result<Vec<Token>> {
    let bytes = pattern.as_bytes();
    let mut tokens = Vec::with_capacity(bytes.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if !c.is_ascii() {
            return Err(ScoopError::pattern_syntax(
                pattern,
                pos,
                "non-ASCII character; use a \\xHH escape",
            ));
        }

        let token = match c {
            b'\\' => {
                let byte = parse_hex_escape(pattern, pos)?;
                pos += 4;
                tokens.push(Token::Literal(byte));
                continue;
            }
            b'.' => Token::Wildcard,
            b'(' => Token::GroupOpen,
            b')' => Token::GroupClose,
            b'|' => Token::Alternate,
            b'*' => Token::ZeroOrMore,
            b'+' => Token::OneOrMore,
            b'?' => Token::ZeroOrOne,
            other => Token::Literal(other),
        };
        tokens.push(token);
        pos += 1;
    }

    Ok(tokens)
}

fn parse_hex_escape(pattern: &str, pos: usize) -> Result<u8> {
    let bytes = pattern.as_bytes();
    if bytes.get(pos + 1) != Some(&b'x') {
        return Err(ScoopError::pattern_syntax(
            pattern,
            pos,
            "only \\xHH escapes are supported",
        ));
    }
    let digits = bytes
        .get(pos + 2..pos + 4)
        .ok_or_else(|| ScoopError::pattern_syntax(pattern, pos, "truncated \\x escape"))?;
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(ScoopError::pattern_syntax(
            pattern,
            pos,
            format!("invalid hex digits {:?}", String::from_utf8_lossy(digits)),
        ));
    }
    let hi = (digits[0] as char).to_digit(16).unwrap_or(0) as u8;
    let lo = (digits[1] as char).to_digit(16).unwrap_or(0) as u8;
    Ok((hi << 4) | lo)
}
