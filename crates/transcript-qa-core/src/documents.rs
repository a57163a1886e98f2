//! Retrieval unit builder.
//!
//! Converts parsed utterances into the units that get embedded:
//!
//! 1. One **speaker turn** unit per utterance, content verbatim.
//! 2. One **conversation window** unit per run of `window` consecutive
//!    utterances (stride 1), rendered as `"<speaker>: <text>"` lines joined
//!    by a blank line.
//!
//! All speaker turns come first, then windows by start index. With `N`
//! utterances the output holds exactly `N + max(0, N - window + 1)` units.

use crate::models::{RetrievalUnit, SpeakerLabels, UnitKind, UnitMetadata, Utterance};

/// Default number of utterances per conversation window.
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Build speaker-turn and conversation-window units from `utterances`.
///
/// A `window` of zero, or larger than the utterance count, produces no
/// window units.
pub fn build_units(
    utterances: &[Utterance],
    window: usize,
    labels: &SpeakerLabels,
) -> Vec<RetrievalUnit> {
    let window_count = if window == 0 {
        0
    } else {
        (utterances.len() + 1).saturating_sub(window)
    };
    let mut units = Vec::with_capacity(utterances.len() + window_count);

    for (i, utterance) in utterances.iter().enumerate() {
        units.push(RetrievalUnit {
            content: utterance.text.clone(),
            metadata: UnitMetadata {
                kind: UnitKind::SpeakerTurn,
                source_indices: vec![i],
                speakers: vec![utterance.speaker],
                length: utterance.text.chars().count(),
            },
        });
    }

    for start in 0..window_count {
        let slice = &utterances[start..start + window];
        let content = slice
            .iter()
            .map(|u| format!("{}: {}", labels.label(u.speaker), u.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let length = content.chars().count();

        units.push(RetrievalUnit {
            content,
            metadata: UnitMetadata {
                kind: UnitKind::ConversationWindow,
                source_indices: (start..start + window).collect(),
                speakers: slice.iter().map(|u| u.speaker).collect(),
                length,
            },
        });
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Speaker;
    use crate::transcript::parse;

    fn utterances(n: usize) -> Vec<Utterance> {
        (0..n)
            .map(|i| Utterance {
                speaker: if i % 2 == 0 {
                    Speaker::Therapist
                } else {
                    Speaker::Subject
                },
                text: format!("line {}", i),
                index: i,
            })
            .collect()
    }

    #[test]
    fn test_unit_counts() {
        let labels = SpeakerLabels::default();
        for n in 0..8 {
            for w in 1..5 {
                let units = build_units(&utterances(n), w, &labels);
                let expected = n + (n + 1).saturating_sub(w);
                assert_eq!(units.len(), expected, "n={} w={}", n, w);
            }
        }
    }

    #[test]
    fn test_two_utterances_have_no_windows() {
        let parsed = parse("[Speaker:0] How are you feeling?\n[Speaker:1] Not great lately.");
        let units = build_units(&parsed, DEFAULT_WINDOW_SIZE, &SpeakerLabels::default());
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|u| u.kind() == UnitKind::SpeakerTurn));
    }

    #[test]
    fn test_zero_window_produces_only_turns() {
        let units = build_units(&utterances(4), 0, &SpeakerLabels::default());
        assert_eq!(units.len(), 4);
    }

    #[test]
    fn test_window_content_and_metadata() {
        let labels = SpeakerLabels::new("Therapist", "Lucy");
        let units = build_units(&utterances(4), 3, &labels);
        assert_eq!(units.len(), 6);

        let first_window = &units[4];
        assert_eq!(first_window.kind(), UnitKind::ConversationWindow);
        assert_eq!(
            first_window.content,
            "Therapist: line 0\n\nLucy: line 1\n\nTherapist: line 2"
        );
        assert_eq!(first_window.metadata.source_indices, vec![0, 1, 2]);
        assert_eq!(
            first_window.metadata.speakers,
            vec![Speaker::Therapist, Speaker::Subject, Speaker::Therapist]
        );
        assert_eq!(
            first_window.metadata.length,
            first_window.content.chars().count()
        );

        assert_eq!(units[5].metadata.source_indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_turns_first_in_order() {
        let units = build_units(&utterances(5), 3, &SpeakerLabels::default());
        for (i, unit) in units.iter().take(5).enumerate() {
            assert_eq!(unit.kind(), UnitKind::SpeakerTurn);
            assert_eq!(unit.content, format!("line {}", i));
            assert_eq!(unit.metadata.source_indices, vec![i]);
        }
        assert!(units[5..]
            .iter()
            .all(|u| u.kind() == UnitKind::ConversationWindow));
    }
}
