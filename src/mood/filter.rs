use serde::{Deserialize, Serialize};

use crate::{
    mood::{Mood, classify},
    types::Track,
};

/// Optional secondary constraints applied after the mood match.
///
/// String fields compare case-insensitively; ranges are inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodFilter {
    pub language: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub energy_range: Option<(f64, f64)>,
    pub valence_range: Option<(f64, f64)>,
}

impl MoodFilter {
    pub fn matches(&self, track: &Track) -> bool {
        if let Some(language) = &self.language {
            match &track.language {
                Some(l) if l.eq_ignore_ascii_case(language) => {}
                _ => return false,
            }
        }

        if let Some(artist) = &self.artist {
            if !track.artists.iter().any(|a| a.name.eq_ignore_ascii_case(artist)) {
                return false;
            }
        }

        if let Some(genre) = &self.genre {
            if !track.genres.iter().any(|g| g.eq_ignore_ascii_case(genre)) {
                return false;
            }
        }

        if let Some(year) = self.year {
            if track.release_year != Some(year) {
                return false;
            }
        }

        if let Some((min, max)) = self.energy_range {
            if !in_range(track.features.energy, min, max) {
                return false;
            }
        }

        if let Some((min, max)) = self.valence_range {
            if !in_range(track.features.valence, min, max) {
                return false;
            }
        }

        true
    }
}

fn in_range(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

/// Keeps the candidates classified as `mood` that also satisfy `constraints`.
///
/// Relative input order is preserved; no ranking is applied.
pub fn filter(mood: Mood, candidates: &[Track], constraints: &MoodFilter) -> Vec<Track> {
    candidates
        .iter()
        .filter(|track| classify(&track.features) == mood && constraints.matches(track))
        .cloned()
        .collect()
}
