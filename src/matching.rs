use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

use crate::normalize::{edit_distance, normalize, sounds_alike};

/// Maximum edit distance still treated as the same town or street.
pub const MAX_EDITS: usize = 2;
pub const PRICE_TOLERANCE: f64 = 0.12;
pub const PRICE_FLOOR: u64 = 15_000;

lazy_static! {
    static ref STREET_ABBREVIATIONS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("st", "street");
        m.insert("rd", "road");
        m.insert("ave", "avenue");
        m.insert("av", "avenue");
        m.insert("ln", "lane");
        m.insert("dr", "drive");
        m.insert("cl", "close");
        m.insert("ct", "court");
        m.insert("cres", "crescent");
        m.insert("gdns", "gardens");
        m.insert("pl", "place");
        m.insert("sq", "square");
        m.insert("tce", "terrace");
        m.insert("terr", "terrace");
        m.insert("gr", "grove");
        m.insert("pk", "park");
        m.insert("wy", "way");
        m
    };
    static ref STREET_TYPES: HashSet<&'static str> = {
        let mut s: HashSet<&'static str> = STREET_ABBREVIATIONS.values().copied().collect();
        s.extend(["hill", "row", "walk", "mews", "green", "rise", "view"]);
        s
    };
}

pub fn canonical_street(text: &str) -> String {
    normalize(text)
        .split(' ')
        .map(|word| STREET_ABBREVIATIONS.get(word).copied().unwrap_or(word))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn town_match(want: &str, got: &str) -> bool {
    let (w, g) = (normalize(want), normalize(got));
    if w.is_empty() || g.is_empty() {
        return false;
    }
    g.contains(&w) || w.contains(&g) || edit_distance(&w, &g) <= MAX_EDITS
}

/// `got` contains `want`, or they are within [`MAX_EDITS`], or they sound alike.
pub fn street_hit(want: &str, got: &str) -> bool {
    let (w, g) = (canonical_street(want), canonical_street(got));
    if w.is_empty() || g.is_empty() {
        return false;
    }
    g.contains(&w) || edit_distance(&w, &g) <= MAX_EDITS || sounds_alike(&w, &g)
}

fn distinctive_words(street: &str) -> Vec<String> {
    canonical_street(street)
        .split(' ')
        .filter(|w| w.chars().count() >= 4)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STREET_TYPES.contains(*w))
        .map(str::to_string)
        .collect()
}

/// [`street_hit`] applied per word: some distinctive word of `want` hits some word of `got`.
pub fn street_word_hit(want: &str, got: &str) -> bool {
    let got = canonical_street(got);
    let got_words: Vec<&str> = got.split(' ').filter(|w| !w.is_empty()).collect();
    distinctive_words(want)
        .iter()
        .any(|w| got_words.iter().any(|g| street_hit(w, g)))
}

pub fn parse_price(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u64>().ok().filter(|p| *p > 0)
}

/// Non-filtering when either price is absent, otherwise within
/// `max(12% of want, 15,000)`.
pub fn price_close(want: Option<u64>, got: Option<u64>) -> bool {
    let (Some(w), Some(g)) = (want, got) else {
        return true;
    };
    if w == 0 || g == 0 {
        return true;
    }
    let band = (w as f64 * PRICE_TOLERANCE).max(PRICE_FLOOR as f64);
    (w.abs_diff(g) as f64) <= band
}
