//! Transcript parser.
//!
//! Turns raw transcript text into an ordered sequence of [`Utterance`]s.
//! Each line carries a speaker tag of the form `[Speaker:<digits>] <text>`;
//! speaker `0` is the therapist and every other number is the subject.
//!
//! Parsing never fails. Lines without a tag, and tags followed by no text,
//! are dropped so that externally produced transcripts degrade to a partial
//! (or empty) sequence instead of an error.
//!
//! # Example
//!
//! ```rust
//! use transcript_qa_core::models::Speaker;
//! use transcript_qa_core::transcript::parse;
//!
//! let utterances = parse("[Speaker:0] How are you?\n[Speaker:1] Tired.");
//! assert_eq!(utterances.len(), 2);
//! assert_eq!(utterances[1].speaker, Speaker::Subject);
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Speaker, Utterance};

// Leftmost well-formed tag wins; the rest of the line is the utterance.
static SPEAKER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Speaker:([0-9]+)\]\s*(.*)").expect("Invalid speaker tag regex")
});

/// Parse raw transcript text into utterances in input order.
pub fn parse(raw: &str) -> Vec<Utterance> {
    let mut utterances = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(caps) = SPEAKER_TAG.captures(line) else {
            continue;
        };

        let text = caps.get(2).map_or("", |m| m.as_str()).trim();
        if text.is_empty() {
            continue;
        }

        let speaker = match caps.get(1).map(|m| m.as_str()) {
            Some("0") => Speaker::Therapist,
            _ => Speaker::Subject,
        };

        utterances.push(Utterance {
            speaker,
            text: text.to_string(),
            index: utterances.len(),
        });
    }

    utterances
}
