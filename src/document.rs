//! Documents and their fields.
//!
//! Every document has the same three fields. `url` is stored verbatim and
//! indexed as a single untokenized term; `title` and `content` are analyzed
//! and stored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrawldexError;

/// One crawled page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Page URL; the line that opened the record.
    pub url: String,
    /// The line right after the URL.
    pub title: String,
    /// Remaining lines of the record, concatenated without a separator.
    pub content: String,
}

impl Document {
    /// Create a document from its three field values.
    pub fn new<U, T, C>(url: U, title: T, content: C) -> Self
    where
        U: Into<String>,
        T: Into<String>,
        C: Into<String>,
    {
        Document {
            url: url.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// The stored value of `field`.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Url => &self.url,
            Field::Title => &self.title,
            Field::Content => &self.content,
        }
    }
}

/// The fields of a [`Document`].
///
/// The declaration order is the on-disk field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Keyword field, one term per document, no norms.
    Url,
    /// Analyzed text field.
    Title,
    /// Analyzed text field.
    Content,
}

impl Field {
    /// All fields in on-disk order.
    pub const ALL: [Field; 3] = [Field::Url, Field::Title, Field::Content];

    /// Fields that go through the analyzer and carry norms.
    pub const ANALYZED: [Field; 2] = [Field::Title, Field::Content];

    /// Field name as used in logs and the CLI.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Url => "url",
            Field::Title => "title",
            Field::Content => "content",
        }
    }

    /// Whether the field is tokenized by the analyzer.
    pub fn is_analyzed(&self) -> bool {
        !matches!(self, Field::Url)
    }

    /// Stable numeric id used in index files.
    pub fn id(&self) -> u8 {
        *self as u8
    }

    /// Inverse of [`Field::id`].
    pub fn from_id(id: u8) -> Option<Field> {
        Field::ALL.get(id as usize).copied()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = CrawldexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| CrawldexError::invalid_argument(format!("Unknown field '{s}'")))
    }
}
