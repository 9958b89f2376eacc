//! Terminal value types of the HLSL declaration grammar.
//!
//! Each token is its own type so the grammar can name it in production
//! signatures. `Display` renders the text a token was lexed from, up to the
//! whitespace run of [`Space`].

use hlslr_parsegen::ActionError;
use std::fmt;

/// A run of whitespace. Only meaningful where the grammar allows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Semicolon;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equals;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colon;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comma;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LBrace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RBrace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LBrack;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RBrack;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LParen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RParen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Less;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greater;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident(pub String);

/// Integer literal. `value` has the sign and base applied, suffixes dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLit {
    pub text: String,
    pub value: i64,
}

/// Floating-point literal, kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatLit {
    pub text: String,
}

/// A single-character operator that only occurs inside opaque bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op(pub char);

/// Characters lexed as [`Op`].
pub const OPERATORS: &str = ".*/|+-&?!%^~";

macro_rules! fixed_text {
    ($($ty:ident => $text:literal),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str($text)
                }
            }
        )+
    };
}

fixed_text! {
    Space => " ",
    Semicolon => ";",
    Equals => "=",
    Colon => ":",
    Comma => ",",
    LBrace => "{",
    RBrace => "}",
    LBrack => "[",
    RBrack => "]",
    LParen => "(",
    RParen => ")",
    Less => "<",
    Greater => ">",
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for IntLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for FloatLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IntLit {
    /// Converts lexed integer text. Fails when the value does not fit in an
    /// `i64`.
    pub fn from_text(text: &str) -> Result<Self, ActionError> {
        let out_of_range = || ActionError::new(format!("integer literal {text} does not fit in 64 bits"));
        let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
        let (negative, digits) = match digits.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, digits),
        };
        let magnitude = match digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => digits.parse::<u64>(),
        }
        .map_err(|_| out_of_range())?;
        let signed = if negative {
            -i128::from(magnitude)
        } else {
            i128::from(magnitude)
        };
        let value = i64::try_from(signed).map_err(|_| out_of_range())?;
        Ok(Self {
            text: text.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_conversion() {
        assert_eq!(IntLit::from_text("42").unwrap().value, 42);
        assert_eq!(IntLit::from_text("-7").unwrap().value, -7);
        assert_eq!(IntLit::from_text("0x1F").unwrap().value, 31);
        assert_eq!(IntLit::from_text("8u").unwrap().value, 8);
        assert_eq!(IntLit::from_text("8u").unwrap().text, "8u");
        assert_eq!(
            IntLit::from_text("-9223372036854775808").unwrap().value,
            i64::MIN
        );
    }

    #[test]
    fn test_int_overflow_is_rejected() {
        let err = IntLit::from_text("9223372036854775808").unwrap_err();
        assert!(err.message.contains("does not fit in 64 bits"));
        assert!(IntLit::from_text("0xFFFFFFFFFFFFFFFFF").is_err());
    }

    #[test]
    fn test_display_reproduces_text() {
        assert_eq!(Ident("float4".into()).to_string(), "float4");
        assert_eq!(Op('&').to_string(), "&");
        assert_eq!(Greater.to_string(), ">");
        assert_eq!(
            FloatLit {
                text: "1.5f".into()
            }
            .to_string(),
            "1.5f"
        );
    }
}
