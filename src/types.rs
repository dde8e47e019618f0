use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::mood::Mood;

/// Access/refresh token pair plus absolute expiry.
///
/// Replaced wholesale on refresh; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_epoch_ms: i64,
    pub token_type: String,
}

impl Credential {
    /// Builds a credential from a relative `expires_in` (seconds) as returned by the
    /// token endpoint.
    pub fn issued_at(
        now_ms: i64,
        access_token: String,
        refresh_token: String,
        expires_in: u64,
        token_type: String,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at_epoch_ms: now_ms.saturating_add((expires_in as i64).saturating_mul(1000)),
            token_type,
        }
    }

    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_epoch_ms
    }
}

/// Raw token endpoint payload. `refresh_token` is optional because providers do
/// not always rotate it on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub country: String,
    pub image_urls: Vec<String>,
    pub follower_count: Option<u64>,
    pub product_tier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub followers: Option<Followers>,
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Followers {
    pub total: u64,
}

impl From<ProfileResponse> for UserProfile {
    fn from(res: ProfileResponse) -> Self {
        Self {
            display_name: res.display_name.unwrap_or_else(|| res.id.clone()),
            id: res.id,
            email: res.email.unwrap_or_default(),
            country: res.country.unwrap_or_default(),
            image_urls: res.images.into_iter().map(|i| i.url).collect(),
            follower_count: res.followers.map(|f| f.total),
            product_tier: res.product,
        }
    }
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub state: Option<String>,
}

/// Numeric audio descriptor supplied by the music catalog, each component in `[0, 1]`.
///
/// `danceability` is carried for forward compatibility; mood classification does not
/// read it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatureVector {
    pub valence: f64,
    pub energy: f64,
    #[serde(default)]
    pub danceability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<Artist>,
    pub album: Album,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    pub features: AudioFeatureVector,
}

impl Track {
    /// Duration formatted as `m:ss`.
    pub fn duration(&self) -> String {
        let minutes = self.duration_ms / 60_000;
        let seconds = (self.duration_ms % 60_000) / 1000;
        format!("{minutes}:{seconds:02}")
    }

    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Listening window for the provider's top-tracks ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Roughly the last four weeks.
    ShortTerm,
    /// Roughly the last six months.
    #[default]
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "short_term" | "short" => Ok(TimeRange::ShortTerm),
            "medium_term" | "medium" => Ok(TimeRange::MediumTerm),
            "long_term" | "long" => Ok(TimeRange::LongTerm),
            other => Err(format!(
                "unknown time range '{other}', expected short_term, medium_term or long_term"
            )),
        }
    }
}

/// Catalog track as returned by the provider's player and top-tracks endpoints.
///
/// Carries no audio features; those come from a separate lookup and are joined in
/// with [`TrackResponse::into_track`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: AlbumResponse,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl TrackResponse {
    pub fn into_track(self, features: AudioFeatureVector) -> Track {
        let release_year = self
            .album
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok());

        Track {
            id: self.id,
            name: self.name,
            artists: self.artists,
            album: Album {
                id: self.album.id,
                name: self.album.name,
            },
            duration_ms: self.duration_ms,
            language: None,
            genres: Vec::new(),
            release_year,
            features,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentlyPlayedResponse {
    #[serde(default)]
    pub items: Vec<PlayHistoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistoryItem {
    pub track: TrackResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlayingResponse {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub item: Option<TrackResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopTracksResponse {
    #[serde(default)]
    pub items: Vec<TrackResponse>,
}

/// Batch audio-feature lookup. Unknown ids come back as `null` entries.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesResponse {
    #[serde(default)]
    pub audio_features: Vec<Option<AudioFeatureEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeatureEntry {
    pub id: String,
    pub valence: f64,
    pub energy: f64,
    #[serde(default)]
    pub danceability: f64,
}

impl From<&AudioFeatureEntry> for AudioFeatureVector {
    fn from(entry: &AudioFeatureEntry) -> Self {
        Self {
            valence: entry.valence,
            energy: entry.energy,
            danceability: entry.danceability,
        }
    }
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub name: String,
    pub artists: String,
    pub duration: String,
    pub mood: Mood,
}

#[derive(Tabled)]
pub struct ProfileTableRow {
    pub field: String,
    pub value: String,
}
