//! Token types for text analysis.
//!
//! # Examples
//!
//! ```
//! use crawldex::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.position, 1);
//! assert_eq!(token.end_offset - token.start_offset, 5);
//! ```

/// A single unit of text produced by a tokenizer and refined by filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token's text content.
    pub text: String,

    /// Position in the token stream (0-based). Filters that drop tokens keep
    /// the original positions of the survivors.
    pub position: usize,

    /// Byte offset of the token start in the original text.
    pub start_offset: usize,

    /// Byte offset one past the token end in the original text.
    pub end_offset: usize,
}

impl Token {
    /// Create a new token with no offset information.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
        }
    }

    /// Create a new token with byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }
}

/// A stream of tokens.
pub type TokenStream = Box<dyn Iterator<Item = Token>>;
