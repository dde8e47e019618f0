use std::{
    collections::{HashMap, HashSet},
    future::Future,
};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    config::ProviderConfig,
    error::AuthError,
    types::{
        AudioFeatureVector, AudioFeaturesResponse, CurrentlyPlayingResponse,
        RecentlyPlayedResponse, TimeRange, TopTracksResponse, Track, TrackResponse,
    },
};

/// Largest page the provider serves for recently played and top tracks.
pub const MAX_PAGE_LIMIT: u32 = 50;

/// Largest id batch accepted by the audio-features lookup.
pub const AUDIO_FEATURES_BATCH: usize = 100;

/// Remote track lookups for the signed-in listener.
pub trait TrackSource: Send + Sync + 'static {
    fn recently_played(
        &self,
        access_token: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<TrackResponse>, AuthError>> + Send;

    /// `None` when nothing is playing.
    fn currently_playing(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Option<TrackResponse>, AuthError>> + Send;

    fn top_tracks(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<TrackResponse>, AuthError>> + Send;

    /// Features keyed by track id. Ids the catalog has no analysis for are absent.
    fn audio_features(
        &self,
        access_token: &str,
        ids: &[String],
    ) -> impl Future<Output = Result<HashMap<String, AudioFeatureVector>, AuthError>> + Send;
}

pub struct SpotifyTrackClient {
    client: Client,
    api_url: String,
}

impl SpotifyTrackClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, access_token: &str, path: &str) -> Result<(StatusCode, String), AuthError> {
        let res = self
            .client
            .get(format!("{}{path}", self.api_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(AuthError::TrackFetchFailed { status, body });
        }
        Ok((status, body))
    }
}

impl TrackSource for SpotifyTrackClient {
    async fn recently_played(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<TrackResponse>, AuthError> {
        let path = format!("/me/player/recently-played?limit={}", clamp_limit(limit));
        let (_, body) = self.get(access_token, &path).await?;
        let res: RecentlyPlayedResponse = parse(&body)?;
        Ok(res.items.into_iter().map(|i| i.track).collect())
    }

    async fn currently_playing(&self, access_token: &str) -> Result<Option<TrackResponse>, AuthError> {
        let (status, body) = self
            .get(access_token, "/me/player/currently-playing")
            .await?;
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(None);
        }

        let res: CurrentlyPlayingResponse = parse(&body)?;
        Ok(res.item)
    }

    async fn top_tracks(
        &self,
        access_token: &str,
        time_range: TimeRange,
        limit: u32,
    ) -> Result<Vec<TrackResponse>, AuthError> {
        let path = format!(
            "/me/top/tracks?time_range={time_range}&limit={limit}",
            limit = clamp_limit(limit)
        );
        let (_, body) = self.get(access_token, &path).await?;
        let res: TopTracksResponse = parse(&body)?;
        Ok(res.items)
    }

    async fn audio_features(
        &self,
        access_token: &str,
        ids: &[String],
    ) -> Result<HashMap<String, AudioFeatureVector>, AuthError> {
        let mut features = HashMap::new();

        for batch in ids.chunks(AUDIO_FEATURES_BATCH) {
            let path = format!("/audio-features?ids={}", batch.join(","));
            let (_, body) = self.get(access_token, &path).await?;
            let res: AudioFeaturesResponse = parse(&body)?;
            for entry in res.audio_features.iter().flatten() {
                features.insert(entry.id.clone(), AudioFeatureVector::from(entry));
            }
        }

        Ok(features)
    }
}

/// Joins catalog tracks with their audio features.
///
/// Keeps the first occurrence of each track id in input order and drops tracks
/// without features, since those cannot be classified.
pub fn attach_features(
    tracks: Vec<TrackResponse>,
    features: &HashMap<String, AudioFeatureVector>,
) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .filter_map(|t| {
            let f = *features.get(&t.id)?;
            Some(t.into_track(f))
        })
        .collect()
}

/// Unique track ids in input order, ready for [`TrackSource::audio_features`].
pub fn track_ids(tracks: &[TrackResponse]) -> Vec<String> {
    let mut seen = HashSet::new();
    tracks
        .iter()
        .filter(|t| seen.insert(t.id.as_str()))
        .map(|t| t.id.clone())
        .collect()
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_PAGE_LIMIT)
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, AuthError> {
    serde_json::from_str(body).map_err(|e| AuthError::MalformedResponse(e.to_string()))
}
