//! Relevance scoring models.
//!
//! A [`Similarity`] is chosen once per index build. At index time it only
//! decides which per-document, per-field norm is persisted; [`Similarity::score`]
//! interprets that norm later, together with collection statistics.
//!
//! # Examples
//!
//! ```
//! use crawldex::similarity::Similarity;
//!
//! let bm25: Similarity = "bm25".parse().unwrap();
//! assert_eq!(bm25.norm(12), 12.0);
//!
//! let classic: Similarity = "tfidf".parse().unwrap();
//! assert_eq!(classic.norm(4), 0.5);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrawldexError;

/// Default BM25 term frequency saturation.
pub const DEFAULT_K1: f32 = 1.2;

/// Default BM25 length normalization strength.
pub const DEFAULT_B: f32 = 0.75;

/// The scoring model of an index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Similarity {
    /// Okapi BM25. Persists the raw field length as the norm.
    Bm25 {
        /// Term frequency saturation.
        k1: f32,
        /// Length normalization strength, in `[0, 1]`.
        b: f32,
    },
    /// Classic vector-space TF-IDF. Persists `1 / sqrt(field_length)` as the norm.
    ClassicTfIdf,
}

impl Default for Similarity {
    fn default() -> Self {
        Similarity::bm25()
    }
}

/// Statistics needed to score one term in one document field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermStats {
    /// Occurrences of the term in the field of this document.
    pub term_freq: u32,
    /// Number of documents containing the term in this field.
    pub doc_freq: u64,
    /// Number of documents in the index.
    pub doc_count: u64,
    /// The persisted norm of this document's field.
    pub norm: f32,
    /// Mean field length across the index.
    pub avg_field_length: f32,
}

impl Similarity {
    /// BM25 with the default parameters.
    pub fn bm25() -> Self {
        Similarity::Bm25 {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
        }
    }

    /// The short name used on the command line and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Similarity::Bm25 { .. } => "bm25",
            Similarity::ClassicTfIdf => "tfidf",
        }
    }

    /// Check the numeric parameters.
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Similarity::Bm25 { k1, b } = *self {
            if !(k1.is_finite() && k1 >= 0.0) {
                return Err(CrawldexError::invalid_argument(format!(
                    "BM25 k1 must be a non-negative number, got {k1}"
                )));
            }
            if !(0.0..=1.0).contains(&b) {
                return Err(CrawldexError::invalid_argument(format!(
                    "BM25 b must be within [0, 1], got {b}"
                )));
            }
        }
        Ok(())
    }

    /// The norm persisted for a field holding `field_length` tokens.
    pub fn norm(&self, field_length: u32) -> f32 {
        match self {
            Similarity::Bm25 { .. } => field_length as f32,
            Similarity::ClassicTfIdf => {
                if field_length == 0 {
                    0.0
                } else {
                    1.0 / (field_length as f32).sqrt()
                }
            }
        }
    }

    /// Inverse document frequency of a term.
    pub fn idf(&self, doc_freq: u64, doc_count: u64) -> f32 {
        let n = doc_count as f64;
        let df = doc_freq as f64;
        let idf = match self {
            Similarity::Bm25 { .. } => (1.0 + (n - df + 0.5) / (df + 0.5)).ln(),
            Similarity::ClassicTfIdf => 1.0 + ((n + 1.0) / (df + 1.0)).ln(),
        };
        idf as f32
    }

    /// Score contribution of one term in one document field.
    pub fn score(&self, stats: &TermStats) -> f32 {
        if stats.term_freq == 0 {
            return 0.0;
        }
        let tf = stats.term_freq as f32;
        let idf = self.idf(stats.doc_freq, stats.doc_count);

        match *self {
            Similarity::Bm25 { k1, b } => {
                let avgdl = if stats.avg_field_length > 0.0 {
                    stats.avg_field_length
                } else {
                    1.0
                };
                let dl = stats.norm;
                idf * tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * dl / avgdl))
            }
            Similarity::ClassicTfIdf => tf.sqrt() * idf * idf * stats.norm,
        }
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Similarity::Bm25 { k1, b } => write!(f, "bm25(k1={k1}, b={b})"),
            Similarity::ClassicTfIdf => write!(f, "tfidf"),
        }
    }
}

impl FromStr for Similarity {
    type Err = CrawldexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bm25" => Ok(Similarity::bm25()),
            "tfidf" | "classic" => Ok(Similarity::ClassicTfIdf),
            other => Err(CrawldexError::invalid_argument(format!(
                "Unknown similarity '{other}', expected 'bm25' or 'tfidf'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(term_freq: u32, norm: f32) -> TermStats {
        TermStats {
            term_freq,
            doc_freq: 10,
            doc_count: 1000,
            norm,
            avg_field_length: 20.0,
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("BM25".parse::<Similarity>().unwrap(), Similarity::bm25());
        assert_eq!("tfidf".parse::<Similarity>().unwrap(), Similarity::ClassicTfIdf);
        assert!("cosine".parse::<Similarity>().is_err());
        assert_eq!(Similarity::default().name(), "bm25");
    }

    #[test]
    fn test_norms() {
        let bm25 = Similarity::bm25();
        assert_eq!(bm25.norm(0), 0.0);
        assert_eq!(bm25.norm(7), 7.0);

        let classic = Similarity::ClassicTfIdf;
        assert_eq!(classic.norm(0), 0.0);
        assert_eq!(classic.norm(1), 1.0);
        assert!((classic.norm(9) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_bm25_saturates_and_penalizes_length() {
        let bm25 = Similarity::bm25();
        let s1 = bm25.score(&stats(1, 20.0));
        let s2 = bm25.score(&stats(2, 20.0));
        let s50 = bm25.score(&stats(50, 20.0));
        assert!(s1 > 0.0 && s2 > s1 && s50 > s2);
        // Upper bound idf * (k1 + 1).
        assert!(s50 < bm25.idf(10, 1000) * (DEFAULT_K1 + 1.0));

        let short = bm25.score(&stats(1, 5.0));
        let long = bm25.score(&stats(1, 80.0));
        assert!(short > long);
    }

    #[test]
    fn test_bm25_matches_formula() {
        let bm25 = Similarity::bm25();
        let idf = (1.0f64 + (1000.0 - 10.0 + 0.5) / (10.0 + 0.5)).ln() as f32;
        let expected = idf * 3.0 * 2.2 / (3.0 + 1.2 * (1.0 - 0.75 + 0.75 * 40.0 / 20.0));
        assert!((bm25.score(&stats(3, 40.0)) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_classic_tfidf() {
        let classic = Similarity::ClassicTfIdf;
        let idf = classic.idf(10, 1000);
        let expected = 2.0 * idf * idf * 0.5;
        assert!((classic.score(&stats(4, 0.5)) - expected).abs() < 1e-4);
        assert!(classic.idf(1, 1000) > classic.idf(500, 1000));
        assert_eq!(classic.score(&stats(0, 0.5)), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(Similarity::bm25().validate().is_ok());
        assert!(Similarity::Bm25 { k1: -1.0, b: 0.5 }.validate().is_err());
        assert!(Similarity::Bm25 { k1: 1.2, b: 1.5 }.validate().is_err());
        assert!(Similarity::ClassicTfIdf.validate().is_ok());
    }

    #[test]
    fn test_serde_round_trip_tagging() {
        let json = serde_json::to_string(&Similarity::bm25()).unwrap();
        assert_eq!(json, r#"{"model":"bm25","k1":1.2,"b":0.75}"#);
        let parsed: Similarity = serde_json::from_str(r#"{"model":"classic_tf_idf"}"#).unwrap();
        assert_eq!(parsed, Similarity::ClassicTfIdf);
    }
}
