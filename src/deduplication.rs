use std::collections::HashSet;

use serde::{Serialize, Serializer};

use crate::source::SourceKind;
use crate::types::{Candidate, RawListing};

/// Insertion-ordered candidates with unique identity keys. First occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    seen: HashSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if !self.seen.insert(candidate.identity_key().to_string()) {
            return false;
        }
        self.items.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.items
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = Self::new();
        for candidate in iter {
            set.insert(candidate);
        }
        set
    }
}

impl Serialize for CandidateSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

pub struct Aggregator;

impl Aggregator {
    /// Normalize and merge batches in fixed source order (sales, lettings fielded,
    /// lettings text), whatever order they arrive in.
    pub fn merge<'a, I>(batches: I) -> CandidateSet
    where
        I: IntoIterator<Item = (SourceKind, &'a [RawListing])>,
    {
        let mut batches: Vec<_> = batches.into_iter().collect();
        batches.sort_by_key(|(kind, _)| SourceKind::ALL.iter().position(|k| k == kind));

        batches
            .into_iter()
            .flat_map(|(kind, records)| {
                let market = kind.market();
                records.iter().map(move |raw| Candidate::from_raw(raw, market))
            })
            .collect()
    }
}
