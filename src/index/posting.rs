//! Posting lists.
//!
//! A posting list holds, for one term, the ascending ids of the documents
//! containing it together with the term's frequency in each. Encoded lists
//! store doc id deltas as varints with the "frequency is one" case folded
//! into the low bit, so the common case costs a single varint per document.

use crate::error::{CrawldexError, Result};
use crate::util::varint::{decode_u64, encode_u64_into};

/// One document entry of a posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// Segment-local document id.
    pub doc_id: u32,
    /// Occurrences of the term in the document's field.
    pub freq: u32,
}

impl Posting {
    pub fn new(doc_id: u32, freq: u32) -> Self {
        Posting { doc_id, freq }
    }
}

/// Documents containing one term, ascending by doc id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
    total_freq: u64,
}

impl PostingList {
    /// Create an empty posting list.
    pub fn new() -> Self {
        PostingList::default()
    }

    /// Append a posting. Doc ids must be strictly ascending and frequencies positive.
    pub fn push(&mut self, posting: Posting) -> Result<()> {
        if posting.freq == 0 {
            return Err(CrawldexError::invalid_argument(format!(
                "Zero frequency posting for doc {}",
                posting.doc_id
            )));
        }
        if let Some(last) = self.postings.last() {
            if posting.doc_id <= last.doc_id {
                return Err(CrawldexError::invalid_argument(format!(
                    "Posting for doc {} out of order after doc {}",
                    posting.doc_id, last.doc_id
                )));
            }
        }
        self.total_freq += posting.freq as u64;
        self.postings.push(posting);
        Ok(())
    }

    /// Append every posting of `other` with its doc ids shifted by `doc_base`.
    pub fn append_rebased(&mut self, other: &PostingList, doc_base: u32) -> Result<()> {
        self.postings.reserve(other.postings.len());
        for posting in &other.postings {
            let doc_id = posting.doc_id.checked_add(doc_base).ok_or_else(|| {
                CrawldexError::invalid_argument("Document id overflow while rebasing postings")
            })?;
            self.push(Posting::new(doc_id, posting.freq))?;
        }
        Ok(())
    }

    /// Number of documents containing the term.
    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    /// Occurrences of the term across all documents.
    pub fn total_freq(&self) -> u64 {
        self.total_freq
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// Encode the list and append it to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        encode_u64_into(self.postings.len() as u64, out);
        let mut prev = 0u32;
        for (i, posting) in self.postings.iter().enumerate() {
            let delta = if i == 0 { posting.doc_id } else { posting.doc_id - prev };
            let delta = delta as u64;
            prev = posting.doc_id;
            if posting.freq == 1 {
                encode_u64_into(delta << 1 | 1, out);
            } else {
                encode_u64_into(delta << 1, out);
                encode_u64_into(posting.freq as u64, out);
            }
        }
    }

    /// Decode a list written by [`PostingList::encode_into`]. `bytes` must hold
    /// exactly one encoded list.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut pos = 0usize;
        let next = |pos: &mut usize| -> Result<u64> {
            let (value, len) = decode_u64(&bytes[*pos..])?;
            *pos += len;
            Ok(value)
        };

        let count = next(&mut pos)? as usize;
        if count > bytes.len() {
            return Err(CrawldexError::corrupt(format!(
                "Posting count {count} exceeds encoded length {}",
                bytes.len()
            )));
        }

        let mut list = PostingList {
            postings: Vec::with_capacity(count),
            total_freq: 0,
        };
        let mut doc_id = 0u64;
        for i in 0..count {
            let code = next(&mut pos)?;
            let delta = code >> 1;
            if i > 0 && delta == 0 {
                return Err(CrawldexError::corrupt("Repeated doc id in posting list"));
            }
            doc_id += delta;
            let freq = if code & 1 == 1 { 1 } else { next(&mut pos)? };
            let doc_id = u32::try_from(doc_id)
                .map_err(|_| CrawldexError::corrupt("Doc id out of range in posting list"))?;
            let freq = u32::try_from(freq)
                .ok()
                .filter(|&f| f > 0)
                .ok_or_else(|| CrawldexError::corrupt("Bad frequency in posting list"))?;
            list.total_freq += freq as u64;
            list.postings.push(Posting::new(doc_id, freq));
        }

        if pos != bytes.len() {
            return Err(CrawldexError::corrupt(format!(
                "{} trailing bytes after posting list",
                bytes.len() - pos
            )));
        }
        Ok(list)
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[(u32, u32)]) -> PostingList {
        let mut list = PostingList::new();
        for &(doc, freq) in entries {
            list.push(Posting::new(doc, freq)).unwrap();
        }
        list
    }

    #[test]
    fn test_push_tracks_frequencies() {
        let list = list(&[(0, 1), (3, 4), (9, 2)]);
        assert_eq!(list.doc_freq(), 3);
        assert_eq!(list.total_freq(), 7);
    }

    #[test]
    fn test_push_rejects_disorder_and_zero_freq() {
        let mut list = list(&[(5, 1)]);
        assert!(list.push(Posting::new(5, 1)).is_err());
        assert!(list.push(Posting::new(2, 1)).is_err());
        assert!(list.push(Posting::new(6, 0)).is_err());
        assert_eq!(list.doc_freq(), 1);
    }

    #[test]
    fn test_encoding_folds_single_frequencies() {
        let mut bytes = Vec::new();
        list(&[(2, 1), (3, 1), (7, 1)]).encode_into(&mut bytes);
        // count, then one byte per posting
        assert_eq!(bytes, vec![3, 2 << 1 | 1, 1 << 1 | 1, 4 << 1 | 1]);

        let mut bytes = Vec::new();
        list(&[(0, 5)]).encode_into(&mut bytes);
        assert_eq!(bytes, vec![1, 0, 5]);
    }

    #[test]
    fn test_decode_restores_list() {
        let original = list(&[(0, 1), (1, 3), (200, 1), (100_000, 17)]);
        let mut bytes = Vec::new();
        original.encode_into(&mut bytes);
        assert_eq!(PostingList::decode(&bytes).unwrap(), original);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut bytes = Vec::new();
        list(&[(1, 1), (2, 2)]).encode_into(&mut bytes);
        bytes.push(0);
        assert!(matches!(
            PostingList::decode(&bytes),
            Err(CrawldexError::Corrupt(_))
        ));
        assert!(PostingList::decode(&bytes[..2]).is_err());
        // second posting with a zero delta
        assert!(PostingList::decode(&[2, 1, 1]).is_err());
    }

    #[test]
    fn test_append_rebased() {
        let mut merged = list(&[(0, 1), (4, 2)]);
        merged.append_rebased(&list(&[(0, 3), (1, 1)]), 5).unwrap();
        let docs: Vec<u32> = merged.iter().map(|p| p.doc_id).collect();
        assert_eq!(docs, vec![0, 4, 5, 6]);
        assert_eq!(merged.total_freq(), 7);

        // base that collides with existing ids
        assert!(merged.append_rebased(&list(&[(0, 1)]), 6).is_err());
    }
}
