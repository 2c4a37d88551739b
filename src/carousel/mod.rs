//! Carousel slide selection.
//!
//! Selection is an explicit filter-then-pick step: the candidate list coming
//! from an adapter is never mutated or re-indexed, so a slide's ordinal always
//! matches its position in the original post.

use crate::extractors::Candidate;
use crate::{Result, SoundclipError};

/// Audio-bearing candidates, in their original order
pub fn selectable(candidates: &[Candidate]) -> Vec<&Candidate> {
    candidates.iter().filter(|candidate| candidate.has_audio).collect()
}

/// Pick the audio-bearing candidate with the given ordinal
pub fn choose(candidates: &[Candidate], ordinal: u32) -> Result<&Candidate> {
    candidates
        .iter()
        .find(|candidate| candidate.ordinal == ordinal && candidate.has_audio)
        .ok_or_else(|| SoundclipError::InvalidSelection {
            ordinal,
            available: selectable(candidates).iter().map(|c| c.ordinal).collect(),
        })
}

/// Selection state for a fetched source
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The source had exactly one candidate; there is nothing to choose
    Implicit(Candidate),

    /// A multi-slide post; every slide is kept, silent ones included
    Carousel(Vec<Candidate>),
}

impl Selection {
    /// Build the selection state, failing with `NoAudio` if nothing is playable
    pub fn from_candidates(mut candidates: Vec<Candidate>) -> Result<Self> {
        if selectable(&candidates).is_empty() {
            return Err(SoundclipError::NoAudio(
                "No slides with audio found in this post".to_string(),
            ));
        }

        if candidates.len() == 1 {
            return Ok(Selection::Implicit(candidates.remove(0)));
        }

        Ok(Selection::Carousel(candidates))
    }

    pub fn is_carousel(&self) -> bool {
        matches!(self, Selection::Carousel(_))
    }

    /// Candidates the user may pick from
    pub fn options(&self) -> Vec<&Candidate> {
        match self {
            Selection::Implicit(candidate) => vec![candidate],
            Selection::Carousel(candidates) => selectable(candidates),
        }
    }

    /// Resolve to one candidate.
    ///
    /// Without an explicit ordinal a carousel falls back to its first slide
    /// with audio.
    pub fn pick(self, ordinal: Option<u32>) -> Result<Candidate> {
        match (self, ordinal) {
            (Selection::Implicit(candidate), None) => Ok(candidate),
            (Selection::Implicit(candidate), Some(ordinal)) => {
                if candidate.ordinal == ordinal {
                    Ok(candidate)
                } else {
                    Err(SoundclipError::InvalidSelection {
                        ordinal,
                        available: vec![candidate.ordinal],
                    })
                }
            }
            (Selection::Carousel(candidates), Some(ordinal)) => choose(&candidates, ordinal).cloned(),
            (Selection::Carousel(candidates), None) => selectable(&candidates)
                .first()
                .map(|candidate| (*candidate).clone())
                .ok_or_else(|| SoundclipError::NoAudio("No slides with audio found".to_string())),
        }
    }
}
