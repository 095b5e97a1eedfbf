use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;

/// Append-only bidirectional term registry with per-term document frequency.
///
/// Term ids are never reused, even if every passage referencing a term is
/// deleted, so previously stored sparse vectors stay valid. The passage
/// counter only increases; deletions leave document frequencies untouched
/// (slightly stale idf after heavy churn is the accepted trade-off).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: HashMap<String, TermId>,
    df: Vec<u32>,
    total_passages: u32,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `term`, assigning a fresh one if unseen. Never fails.
    pub fn intern(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.terms.get(term) {
            return id;
        }
        let id = self.df.len() as TermId;
        self.terms.insert(term.to_string(), id);
        self.df.push(0);
        id
    }

    /// Id lookup without interning; `None` for out-of-vocabulary terms.
    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.terms.get(term).copied()
    }

    pub fn document_frequency(&self, term_id: TermId) -> u32 {
        self.df.get(term_id as usize).copied().unwrap_or(0)
    }

    /// Number of distinct known terms.
    pub fn size(&self) -> usize {
        self.df.len()
    }

    pub fn total_passages(&self) -> u32 {
        self.total_passages
    }

    /// Record one newly ingested passage: bump the passage counter and the
    /// document frequency of each distinct term it contains.
    pub fn record_passage<I>(&mut self, distinct_terms: I)
    where
        I: IntoIterator<Item = TermId>,
    {
        self.total_passages += 1;
        self.record_terms(distinct_terms);
    }

    /// Bump document frequency without touching the passage counter. Used
    /// when a passage is replaced in place: the slot already counted.
    pub fn record_terms<I>(&mut self, distinct_terms: I)
    where
        I: IntoIterator<Item = TermId>,
    {
        for id in distinct_terms {
            if let Some(slot) = self.df.get_mut(id as usize) {
                *slot += 1;
            }
        }
    }

    /// Undo the document-frequency contribution of a passage being replaced.
    ///
    /// Used only on upsert-over-existing-id so a repeated upsert leaves
    /// corpus statistics bit-identical; plain deletes never decrement.
    pub fn unrecord_terms<I>(&mut self, distinct_terms: I)
    where
        I: IntoIterator<Item = TermId>,
    {
        for id in distinct_terms {
            if let Some(slot) = self.df.get_mut(id as usize) {
                *slot = slot.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut v = Vocabulary::new();
        let a = v.intern("geist");
        let b = v.intern("seele");
        assert_ne!(a, b);
        assert_eq!(v.intern("geist"), a);
        assert_eq!(v.size(), 2);
    }

    #[test]
    fn document_frequency_tracks_distinct_passages() {
        let mut v = Vocabulary::new();
        let a = v.intern("idee");
        let b = v.intern("begriff");
        v.record_passage([a, b]);
        v.record_passage([a]);
        assert_eq!(v.total_passages(), 2);
        assert_eq!(v.document_frequency(a), 2);
        assert_eq!(v.document_frequency(b), 1);
    }

    #[test]
    fn oov_lookup_is_none() {
        let v = Vocabulary::new();
        assert_eq!(v.term_id("unbekannt"), None);
        assert_eq!(v.document_frequency(99), 0);
    }

    #[test]
    fn unrecord_reverses_df_only() {
        let mut v = Vocabulary::new();
        let a = v.intern("wille");
        v.record_passage([a]);
        v.unrecord_terms([a]);
        assert_eq!(v.document_frequency(a), 0);
        // the passage counter never decreases
        assert_eq!(v.total_passages(), 1);
    }
}
