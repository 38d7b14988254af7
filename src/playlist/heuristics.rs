//! Keyword and regex detectors run over the raw request before any
//! completion call. Each detector is pure and independent; the extractor
//! decides how their findings are layered.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DURATION: Regex =
        Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*-?\s*(hours?|hrs?|minutes?|mins?)\b").unwrap();
    static ref SONG_COUNT: Regex = Regex::new(r"(?i)\b(\d+)\s*(?:songs?|tracks?)\b").unwrap();
    static ref TEMPO_RANGE: Regex =
        Regex::new(r"(?i)\b(\d{2,3})\s*(?:bpm\s*)?(?:to|-)\s*(\d{2,3})\s*bpm\b").unwrap();
    static ref REFERENCE: Regex = Regex::new(r"(?i)\bsounds?\s+like\s+(.+?)\s+but\b").unwrap();
}

/// Where a duration came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationHint {
    /// "<N> hours/min" in the request, already converted to whole minutes.
    Explicit(f64),
    /// A scenario phrase with a conventional length.
    Scenario { phrase: &'static str, minutes: f64 },
}

const SCENARIOS: &[(&str, f64)] = &[("car ride", 45.0), ("workout", 60.0), ("study session", 90.0)];

/// A themed request that implies a genre and mood palette.
#[derive(Debug, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub triggers: &'static [&'static str],
    pub genres: &'static [&'static str],
    pub moods: &'static [&'static str],
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "cinematic",
        triggers: &["movie", "soundtrack", "cinematic"],
        genres: &["orchestral", "cinematic", "electronic", "synthwave", "ambient"],
        moods: &["epic", "dramatic", "adventurous"],
    },
    Theme {
        name: "relaxation",
        triggers: &["relax", "stress"],
        genres: &["lofi", "chill", "ambient", "soft rock", "indie"],
        moods: &["calm", "peaceful", "soothing"],
    },
];

/// Checked in order; the first whole-word match wins.
pub const KNOWN_GENRES: &[&str] = &[
    "hip hop", "rock", "pop", "jazz", "classical", "electronic", "edm", "house", "techno",
    "country", "r&b", "metal", "indie", "lofi", "reggae", "blues", "folk", "punk", "soul", "funk",
    "ambient",
];

pub const INSTRUMENTS: &[&str] = &[
    "piano",
    "guitar",
    "violin",
    "saxophone",
    "drums",
    "cello",
    "synth",
    "trumpet",
    "flute",
    "bass",
];

const PERSONAL_ONLY_PHRASES: &[&str] = &[
    "only my liked songs",
    "only my favorites",
    "only my favourites",
    "only my favorite songs",
    "only my favourite songs",
    "only my top tracks",
    "only my songs",
    "only my library",
    "only from my library",
    "just my liked songs",
];

const GRADUAL_PHRASES: &[&str] = &[
    "gradual",
    "increasing tempo",
    "increasing bpm",
    "increase the tempo",
    "increase the bpm",
    "build up",
    "builds up",
    "ramp up",
    "ramping up",
];

const EXCLUDE_ARTIST_PHRASES: &[&str] = &[
    "not by the same artist",
    "not the same artist",
    "different artist",
    "not by that artist",
    "other artists",
    "exclude the artist",
    "exclude this artist",
    "without the same artist",
];

/// Boolean findings from fixed phrase lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFlags {
    pub personal_only: bool,
    pub gradual: bool,
    pub instrument: Option<&'static str>,
    pub tempo_sensitive: bool,
    pub exclude_reference_artist: bool,
}

pub fn detect_duration(query: &str) -> Option<DurationHint> {
    if let Some(caps) = DURATION.captures(query) {
        let value: f64 = caps[1].parse().ok()?;
        let unit = caps[2].to_lowercase();
        let minutes = if unit.starts_with('h') {
            (value * 60.0).trunc()
        } else {
            value.trunc()
        };
        if minutes > 0.0 {
            return Some(DurationHint::Explicit(minutes));
        }
    }

    let lowered = query.to_lowercase();
    SCENARIOS
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map(|(phrase, minutes)| DurationHint::Scenario {
            phrase,
            minutes: *minutes,
        })
}

pub fn detect_song_count(query: &str) -> Option<usize> {
    SONG_COUNT
        .captures(query)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|n| *n >= 1)
}

/// "<A> to <B> bpm" or "<A>-<B> bpm".
pub fn detect_tempo_range(query: &str) -> Option<(f64, f64)> {
    let caps = TEMPO_RANGE.captures(query)?;
    let low: f64 = caps[1].parse().ok()?;
    let high: f64 = caps[2].parse().ok()?;
    Some((low, high))
}

pub fn detect_theme(query: &str) -> Option<&'static Theme> {
    let lowered = query.to_lowercase();
    THEMES
        .iter()
        .find(|theme| theme.triggers.iter().any(|t| lowered.contains(t)))
}

pub fn detect_known_genre(query: &str) -> Option<&'static str> {
    let lowered = query.to_lowercase();
    KNOWN_GENRES
        .iter()
        .copied()
        .find(|genre| contains_word(&lowered, genre))
}

pub fn detect_flags(query: &str) -> RequestFlags {
    let lowered = query.to_lowercase();
    RequestFlags {
        personal_only: PERSONAL_ONLY_PHRASES.iter().any(|p| lowered.contains(p)),
        gradual: GRADUAL_PHRASES.iter().any(|p| lowered.contains(p)),
        instrument: INSTRUMENTS
            .iter()
            .copied()
            .find(|instrument| contains_word(&lowered, instrument)),
        tempo_sensitive: lowered.contains("bpm"),
        exclude_reference_artist: EXCLUDE_ARTIST_PHRASES.iter().any(|p| lowered.contains(p)),
    }
}

/// "sounds like X but ..." captures X.
pub fn detect_reference(query: &str) -> Option<String> {
    REFERENCE
        .captures(query)
        .map(|caps| caps[1].trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|r| !r.is_empty())
}

/// Whole-word (or whole-phrase) containment on an already lowercased haystack.
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let end = start + word.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
