//! Topic binding patterns.

use std::str::FromStr;

use crate::error::BrokerError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Word(String),
    /// `*` matches exactly one word.
    Star,
    /// `#` matches zero or more words.
    Hash,
}

/// A topic exchange binding pattern such as `balance.*` or `saga.#`.
///
/// Routing keys and patterns are dot-separated words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl TopicPattern {
    /// Returns true if `routing_key` matches this pattern.
    pub fn matches(&self, routing_key: &str) -> bool {
        let words: Vec<&str> = routing_key.split('.').collect();
        match_segments(&self.segments, &words)
    }
}

fn match_segments(segments: &[Segment], words: &[&str]) -> bool {
    match segments.split_first() {
        None => words.is_empty(),
        Some((Segment::Hash, rest)) => {
            match_segments(rest, words)
                || (!words.is_empty() && match_segments(segments, &words[1..]))
        }
        Some((Segment::Star, rest)) => !words.is_empty() && match_segments(rest, &words[1..]),
        Some((Segment::Word(word), rest)) => {
            words.first() == Some(&word.as_str()) && match_segments(rest, &words[1..])
        }
    }
}

impl FromStr for TopicPattern {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split('.')
            .map(|word| match word {
                "*" => Ok(Segment::Star),
                "#" => Ok(Segment::Hash),
                w if w.contains(['*', '#']) => Err(BrokerError::InvalidPattern {
                    pattern: s.to_string(),
                    reason: format!("wildcard inside word {w:?}"),
                }),
                w => Ok(Segment::Word(w.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }
}

impl std::fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
