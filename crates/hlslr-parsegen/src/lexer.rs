//! Token rules and maximal-munch matching.

use crate::error::ActionError;
use crate::symbol::Symbol;

/// What a token rule matches at the cursor.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// The exact text.
    Literal(&'static str),
    /// Any single character of the set.
    AnyOf(&'static str),
    /// A scanner returning how many bytes it accepts, 0 for no match.
    Scan(fn(&str) -> usize),
}

impl Pattern {
    /// Length in bytes of the match at the start of `input`.
    pub fn match_len(&self, input: &str) -> Option<usize> {
        let len = match self {
            Pattern::Literal(text) => {
                if !text.is_empty() && input.starts_with(text) {
                    text.len()
                } else {
                    0
                }
            }
            Pattern::AnyOf(set) => match input.chars().next() {
                Some(c) if set.contains(c) => c.len_utf8(),
                _ => 0,
            },
            Pattern::Scan(scan) => scan(input),
        };
        (len > 0).then_some(len)
    }
}

pub(crate) type Convert<V> = Box<dyn Fn(&str) -> Result<V, ActionError> + Send + Sync>;

pub(crate) struct TokenRule<V> {
    pub(crate) symbol: Symbol,
    pub(crate) pattern: Pattern,
    pub(crate) convert: Convert<V>,
}

/// Ordered token rules of a grammar.
pub struct LexerSpec<V> {
    rules: Vec<TokenRule<V>>,
}

/// The winning rule at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub rule: usize,
    pub symbol: Symbol,
    pub len: usize,
}

impl<V> LexerSpec<V> {
    pub(crate) fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub(crate) fn push(&mut self, rule: TokenRule<V>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn produces(&self, symbol: Symbol) -> bool {
        self.rules.iter().any(|rule| rule.symbol == symbol)
    }

    /// Longest match at the start of `input`; ties go to the earlier rule.
    pub fn longest_match(&self, input: &str) -> Option<Match> {
        let mut best: Option<Match> = None;
        for (index, rule) in self.rules.iter().enumerate() {
            let Some(len) = rule.pattern.match_len(input) else {
                continue;
            };
            if best.map_or(true, |b| len > b.len) {
                best = Some(Match {
                    rule: index,
                    symbol: rule.symbol,
                    len,
                });
            }
        }
        best
    }

    pub(crate) fn convert(&self, rule: usize, lexeme: &str) -> Result<V, ActionError> {
        (self.rules[rule].convert)(lexeme)
    }
}

/// Scanners shared by C-like languages.
pub mod patterns {
    fn digits(bytes: &[u8], from: usize) -> usize {
        bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count()
    }

    fn sign(bytes: &[u8]) -> usize {
        usize::from(bytes.first() == Some(&b'-'))
    }

    pub fn whitespace(input: &str) -> usize {
        input
            .bytes()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c))
            .count()
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    pub fn identifier(input: &str) -> usize {
        let bytes = input.as_bytes();
        match bytes.first() {
            Some(b) if b.is_ascii_alphabetic() || *b == b'_' => bytes
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
                .count(),
            _ => 0,
        }
    }

    /// Optional minus, decimal or `0x` hexadecimal digits, integer suffixes.
    pub fn signed_integer(input: &str) -> usize {
        let bytes = input.as_bytes();
        let start = sign(bytes);
        let mut end = start;
        if bytes[start..].starts_with(b"0x") || bytes[start..].starts_with(b"0X") {
            let hex = bytes[start + 2..]
                .iter()
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            if hex > 0 {
                end = start + 2 + hex;
            }
        }
        if end == start {
            let count = digits(bytes, start);
            if count == 0 {
                return 0;
            }
            end = start + count;
        }
        end + bytes[end..]
            .iter()
            .take_while(|b| matches!(b, b'u' | b'U' | b'l' | b'L'))
            .count()
    }

    /// Optional minus, a mantissa with a dot or an exponent, optional suffix.
    pub fn signed_float(input: &str) -> usize {
        let bytes = input.as_bytes();
        let start = sign(bytes);
        let whole = digits(bytes, start);
        let mut end = start + whole;
        let mut has_dot = false;
        if bytes.get(end) == Some(&b'.') {
            let fraction = digits(bytes, end + 1);
            if whole == 0 && fraction == 0 {
                return 0;
            }
            has_dot = true;
            end += 1 + fraction;
        } else if whole == 0 {
            return 0;
        }

        let mut has_exponent = false;
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut cursor = end + 1;
            if matches!(bytes.get(cursor), Some(b'+' | b'-')) {
                cursor += 1;
            }
            let exponent = digits(bytes, cursor);
            if exponent > 0 {
                has_exponent = true;
                end = cursor + exponent;
            }
        }

        if !has_dot && !has_exponent {
            return 0;
        }
        if matches!(bytes.get(end), Some(b'f' | b'F' | b'h' | b'H' | b'l' | b'L')) {
            end += 1;
        }
        end
    }
}
