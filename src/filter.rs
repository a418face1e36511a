use tracing::{debug, info};

use crate::matching::{price_close, street_hit, street_word_hit, town_match};
use crate::normalize::{normalize, sounds_alike};
use crate::types::{Candidate, Query};

struct Wanted {
    street: String,
    town: String,
    price: Option<u64>,
}

impl Wanted {
    fn from_query(query: &Query) -> Self {
        Self {
            street: normalize(&query.street),
            town: normalize(&query.town),
            price: query.wanted_price(),
        }
    }

    fn town_ok(&self, c: &Candidate) -> bool {
        self.town.is_empty() || town_match(&self.town, &c.town) || town_match(&self.town, &c.address)
    }

    fn street_ok(&self, c: &Candidate) -> bool {
        self.street.is_empty()
            || street_hit(&self.street, &c.street)
            || street_hit(&self.street, &c.address)
    }

    fn price_ok(&self, c: &Candidate) -> bool {
        price_close(self.price, c.price)
    }
}

pub fn strict_filter(candidates: &[Candidate], query: &Query) -> Vec<Candidate> {
    let wanted = Wanted::from_query(query);
    candidates
        .iter()
        .filter(|c| wanted.town_ok(c) && wanted.street_ok(c) && wanted.price_ok(c))
        .cloned()
        .collect()
}

/// Street closeness score, lower is better. A matching Soundex code earns one point.
fn street_score(want: &str, got: &str) -> i64 {
    let got = normalize(got);
    let distance = strsim::levenshtein(want, &got) as i64;
    if sounds_alike(want, &got) {
        distance - 1
    } else {
        distance
    }
}

/// Town-only survivors ordered by street closeness (stable), truncated to `limit`.
pub fn rank_by_town(candidates: &[Candidate], query: &Query, limit: usize) -> Vec<Candidate> {
    let wanted = Wanted::from_query(query);
    if wanted.town.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(i64, &Candidate)> = candidates
        .iter()
        .filter(|c| town_match(&wanted.town, &c.town) || town_match(&wanted.town, &c.address))
        .map(|c| {
            let score = street_score(&wanted.street, &c.street)
                .min(street_score(&wanted.street, &c.address));
            (score, c)
        })
        .collect();

    scored.sort_by_key(|(score, _)| *score);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, c)| c.clone())
        .collect()
}

/// Fallback widening: rank by town alone, then validate the shortlist on street
/// (whole string or word by word) and price.
pub fn widen(candidates: &[Candidate], query: &Query, limit: usize) -> Vec<Candidate> {
    let wanted = Wanted::from_query(query);
    let shortlist = rank_by_town(candidates, query, limit);
    debug!(
        "[Filter] fallback shortlist: {} of {} candidate(s)",
        shortlist.len(),
        candidates.len()
    );

    shortlist
        .into_iter()
        .filter(|c| {
            wanted.street_ok(c)
                || street_word_hit(&wanted.street, &c.street)
                || street_word_hit(&wanted.street, &c.address)
        })
        .filter(|c| wanted.price_ok(c))
        .collect()
}

pub fn select(candidates: &[Candidate], query: &Query, limit: usize) -> Vec<Candidate> {
    let strict = strict_filter(candidates, query);
    if !strict.is_empty() || normalize(&query.town).is_empty() {
        return strict;
    }
    info!(
        "[Filter] no strict match among {} listing(s), widening by town",
        candidates.len()
    );
    widen(candidates, query, limit)
}
