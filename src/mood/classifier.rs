use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AudioFeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Energetic,
    Calm,
    Romantic,
    Angry,
    Nostalgic,
    Focused,
    Party,
    Chill,
}

impl Mood {
    pub const ALL: [Mood; 10] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Energetic,
        Mood::Calm,
        Mood::Romantic,
        Mood::Angry,
        Mood::Nostalgic,
        Mood::Focused,
        Mood::Party,
        Mood::Chill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Energetic => "energetic",
            Mood::Calm => "calm",
            Mood::Romantic => "romantic",
            Mood::Angry => "angry",
            Mood::Nostalgic => "nostalgic",
            Mood::Focused => "focused",
            Mood::Party => "party",
            Mood::Chill => "chill",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mood '{0}'")]
pub struct ParseMoodError(String);

impl FromStr for Mood {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == needle)
            .ok_or_else(|| ParseMoodError(s.to_string()))
    }
}

/// Maps audio features to a mood.
///
/// Rules are evaluated top to bottom and the first match wins. All bounds are
/// strict, so points sitting exactly on a threshold fall through to later rules and
/// ultimately to [`Mood::Chill`].
///
/// `danceability` is intentionally not consulted by any rule.
pub fn classify(features: &AudioFeatureVector) -> Mood {
    let v = features.valence;
    let e = features.energy;

    if v > 0.7 && e > 0.7 {
        Mood::Party
    } else if v > 0.6 && e > 0.6 {
        Mood::Energetic
    } else if v > 0.6 && e < 0.5 {
        Mood::Happy
    } else if v < 0.4 && e < 0.4 {
        Mood::Sad
    } else if v > 0.4 && v < 0.6 && e < 0.4 {
        Mood::Calm
    } else if v > 0.5 && e > 0.3 && e < 0.7 {
        Mood::Romantic
    } else if v < 0.3 && e > 0.6 {
        Mood::Angry
    } else if v < 0.5 && e > 0.4 && e < 0.7 {
        Mood::Nostalgic
    } else if v > 0.3 && v < 0.6 && e > 0.2 && e < 0.6 {
        Mood::Focused
    } else {
        Mood::Chill
    }
}
