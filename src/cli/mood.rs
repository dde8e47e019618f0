use std::path::{Path, PathBuf};

use tabled::Table;

use crate::{
    error, info,
    mood::{Mood, MoodFilter, classify as classify_features, filter as filter_tracks},
    spotify::{
        SpotifyTrackClient, TrackSource,
        tracks::{attach_features, track_ids},
    },
    success,
    types::{AudioFeatureVector, TimeRange, Track, TrackResponse, TrackTableRow},
};

use super::{session_manager, spinner};

/// Where `filter` takes its candidate tracks from.
#[derive(Debug, Clone)]
pub enum TrackInput {
    File(PathBuf),
    Remote(RemoteTracks),
}

/// Track lists read from the signed-in listener's account.
#[derive(Debug, Clone, Copy)]
pub enum RemoteTracks {
    RecentlyPlayed { limit: u32 },
    TopTracks { time_range: TimeRange, limit: u32 },
}

pub fn classify(features: AudioFeatureVector) {
    let mood = classify_features(&features);
    success!(
        "valence {:.2}, energy {:.2} -> {}",
        features.valence,
        features.energy,
        mood
    );
}

/// Prints the candidate tracks that classify as `mood` and satisfy `constraints`,
/// in their original order.
pub async fn filter(mood: Mood, input: TrackInput, constraints: MoodFilter) {
    let tracks = match input {
        TrackInput::File(path) => read_tracks(&path).await,
        TrackInput::Remote(remote) => fetch_tracks(remote).await,
    };

    let matches = filter_tracks(mood, &tracks, &constraints);
    if matches.is_empty() {
        info!("No {} tracks among {} candidates.", mood, tracks.len());
        return;
    }

    println!("{}", Table::new(table_rows(&matches)));
    success!("{} of {} tracks match {}.", matches.len(), tracks.len(), mood);
}

/// Shows the track playing right now together with its mood.
pub async fn playing() {
    let (token, client) = signed_in_track_client().await;

    let pb = spinner("Checking player...");
    let current = client.currently_playing(&token).await;
    pb.finish_and_clear();

    let track = match current {
        Ok(Some(track)) => track,
        Ok(None) => {
            info!("Nothing is playing right now.");
            return;
        }
        Err(e) => error!("Cannot read player ({}): {}", e.kind(), e),
    };

    let tracks = with_features(&client, &token, vec![track.clone()]).await;
    match tracks.first() {
        Some(t) => println!("{}", Table::new(table_rows(std::slice::from_ref(t)))),
        None => info!(
            "Now playing {} ({}), no audio features available.",
            track.name,
            track.id
        ),
    }
}

async fn read_tracks(path: &Path) -> Vec<Track> {
    let content = match async_fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) => error!("Cannot read {}: {}", path.display(), e),
    };

    match serde_json::from_str(&content) {
        Ok(t) => t,
        Err(e) => error!("Cannot parse tracks in {}: {}", path.display(), e),
    }
}

async fn fetch_tracks(remote: RemoteTracks) -> Vec<Track> {
    let (token, client) = signed_in_track_client().await;

    let pb = spinner("Fetching tracks...");
    let fetched = match remote {
        RemoteTracks::RecentlyPlayed { limit } => client.recently_played(&token, limit).await,
        RemoteTracks::TopTracks { time_range, limit } => {
            client.top_tracks(&token, time_range, limit).await
        }
    };
    pb.finish_and_clear();

    match fetched {
        Ok(tracks) => with_features(&client, &token, tracks).await,
        Err(e) => error!("Cannot fetch tracks ({}): {}", e.kind(), e),
    }
}

async fn with_features(
    client: &SpotifyTrackClient,
    token: &str,
    tracks: Vec<TrackResponse>,
) -> Vec<Track> {
    let pb = spinner("Loading audio features...");
    let features = client.audio_features(token, &track_ids(&tracks)).await;
    pb.finish_and_clear();

    match features {
        Ok(features) => attach_features(tracks, &features),
        Err(e) => error!("Cannot load audio features ({}): {}", e.kind(), e),
    }
}

async fn signed_in_track_client() -> (String, SpotifyTrackClient) {
    let manager = match session_manager() {
        Ok(m) => m,
        Err(e) => error!("Cannot load session: {}", e),
    };

    if let Err(e) = manager.restore().await {
        error!("Cannot restore session: {}", e);
    }

    let token = match manager.access_token().await {
        Ok(token) => token,
        Err(e) => error!("No usable token ({}): {}. Run moodgroov login.", e.kind(), e),
    };

    match SpotifyTrackClient::new(manager.flow().config()) {
        Ok(client) => (token, client),
        Err(e) => error!("Cannot create track client: {}", e),
    }
}

fn table_rows(tracks: &[Track]) -> Vec<TrackTableRow> {
    tracks
        .iter()
        .map(|t| TrackTableRow {
            name: t.name.clone(),
            artists: t.artist_names(),
            duration: t.duration(),
            mood: classify_features(&t.features),
        })
        .collect()
}
