use crate::normalizer::is_spelled_number;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Closed set of query categories, one per alpha bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum QueryCategory {
    #[serde(rename = "contains-digit")]
    ContainsDigit,
    #[serde(rename = "contains-spelled-number")]
    ContainsSpelledNumber,
    #[serde(rename = "concept-match")]
    ConceptMatch,
    #[serde(rename = "general")]
    General,
}

impl QueryCategory {
    pub fn name(self) -> &'static str {
        match self {
            Self::ContainsDigit => "contains-digit",
            Self::ContainsSpelledNumber => "contains-spelled-number",
            Self::ConceptMatch => "concept-match",
            Self::General => "general",
        }
    }

    pub fn all() -> [QueryCategory; 4] {
        [
            Self::ContainsDigit,
            Self::ContainsSpelledNumber,
            Self::ConceptMatch,
            Self::General,
        ]
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-category recommended fusion weights.
///
/// The shipped defaults are starting priors from the source corpus's
/// empirical tuning band, meant to be overwritten by the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaProfile {
    alphas: BTreeMap<QueryCategory, f32>,
}

impl Default for AlphaProfile {
    fn default() -> Self {
        let alphas = BTreeMap::from([
            (QueryCategory::ContainsDigit, 0.4),
            (QueryCategory::ContainsSpelledNumber, 0.4),
            (QueryCategory::ConceptMatch, 0.7),
            (QueryCategory::General, 0.5),
        ]);
        Self { alphas }
    }
}

impl AlphaProfile {
    pub fn alpha_for(&self, category: QueryCategory) -> f32 {
        self.alphas.get(&category).copied().unwrap_or(0.5)
    }

    pub fn set(&mut self, category: QueryCategory, alpha: f32) {
        self.alphas.insert(category, alpha);
    }

    /// Fold optimizer output into the profile, replacing tuned categories
    /// and leaving untuned ones at their previous value.
    pub fn apply(&mut self, tuned: &BTreeMap<QueryCategory, f32>) {
        for (&category, &alpha) in tuned {
            self.alphas.insert(category, alpha);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (QueryCategory, f32)> + '_ {
        self.alphas.iter().map(|(&c, &a)| (c, a))
    }
}

/// Deterministic rule cascade mapping a raw query to its alpha bucket.
///
/// Rules run in fixed priority order, so a query belongs to exactly one
/// category; anything unmatched falls through to `General`. Classification
/// looks at the raw text (pre-normalization), since number canonicalization
/// would erase the digit/spelled distinction the buckets encode.
pub struct QueryClassifier {
    concepts: HashSet<String>,
}

impl QueryClassifier {
    pub fn new<I, S>(concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let concepts = concepts
            .into_iter()
            .map(|c| c.as_ref().nfkc().collect::<String>().to_lowercase())
            .collect();
        Self { concepts }
    }

    /// The philosophical vocabulary of the source corpus, including the
    /// twelve Weltanschauungen.
    pub fn default_concepts() -> Vec<String> {
        [
            "weltanschauung",
            "weltanschauungen",
            "materialismus",
            "spiritualismus",
            "realismus",
            "idealismus",
            "mathematismus",
            "rationalismus",
            "psychismus",
            "pneumatismus",
            "monadismus",
            "dynamismus",
            "phänomenalismus",
            "sensualismus",
            "anthroposophie",
            "erkenntnistheorie",
            "metaphysik",
            "ontologie",
            "dialektik",
            "phänomenologie",
            "bewusstsein",
            "freiheit",
            "denken",
            "wahrnehmung",
            "begriff",
            "geist",
            "seele",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    pub fn classify(&self, raw_query: &str) -> QueryCategory {
        if raw_query.chars().any(|c| c.is_ascii_digit()) {
            return QueryCategory::ContainsDigit;
        }
        let folded = raw_query.nfkc().collect::<String>().to_lowercase();
        let words = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty());
        let mut concept_hit = false;
        for word in words {
            if is_spelled_number(word) {
                return QueryCategory::ContainsSpelledNumber;
            }
            concept_hit = concept_hit || self.concepts.contains(word);
        }
        if concept_hit {
            QueryCategory::ConceptMatch
        } else {
            QueryCategory::General
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> QueryClassifier {
        QueryClassifier::new(QueryClassifier::default_concepts())
    }

    #[test]
    fn digit_takes_priority() {
        let c = classifier();
        assert_eq!(
            c.classify("Welches sind die 12 Weltanschauungen?"),
            QueryCategory::ContainsDigit
        );
    }

    #[test]
    fn spelled_number_beats_concept() {
        let c = classifier();
        assert_eq!(
            c.classify("Die zwölf Weltanschauungen nach Rudolf Steiner"),
            QueryCategory::ContainsSpelledNumber
        );
    }

    #[test]
    fn concept_match() {
        let c = classifier();
        assert_eq!(
            c.classify("Was bedeutet Idealismus?"),
            QueryCategory::ConceptMatch
        );
    }

    #[test]
    fn falls_through_to_general() {
        let c = classifier();
        assert_eq!(c.classify("Wer war Aristoteles?"), QueryCategory::General);
        assert_eq!(c.classify(""), QueryCategory::General);
    }

    #[test]
    fn profile_priors_and_apply() {
        let mut profile = AlphaProfile::default();
        assert_eq!(profile.alpha_for(QueryCategory::General), 0.5);
        let tuned = BTreeMap::from([(QueryCategory::ContainsDigit, 0.6)]);
        profile.apply(&tuned);
        assert_eq!(profile.alpha_for(QueryCategory::ContainsDigit), 0.6);
        assert_eq!(profile.alpha_for(QueryCategory::ConceptMatch), 0.7);
    }

    #[test]
    fn category_names_round_trip() {
        for cat in QueryCategory::all() {
            let json = serde_json::to_string(&cat).unwrap();
            assert_eq!(json, format!("\"{}\"", cat.name()));
            let back: QueryCategory = serde_json::from_str(&json).unwrap();
            assert_eq!(back, cat);
        }
    }
}
