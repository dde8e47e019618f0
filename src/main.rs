use std::path::PathBuf;

use clap::{
    ArgGroup, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use moodgroov::{
    cli::{self, RemoteTracks, TrackInput},
    config, error,
    mood::{Mood, MoodFilter},
    types::{AudioFeatureVector, TimeRange},
    utils,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in through the provider's authorization page
    Login,

    /// Show who is signed in
    Status,

    /// Print a valid access token, refreshing it if needed
    Token,

    /// Forget the stored credential
    Logout,

    /// Classify audio feature values into a mood
    Classify(ClassifyOptions),

    /// Select tracks of a mood from a JSON track list or your listening history
    Filter(FilterOptions),

    /// Show the track playing now and its mood
    Playing,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ClassifyOptions {
    /// Musical positivity (0..=1)
    #[clap(long, value_parser = utils::parse_unit)]
    pub valence: f64,

    /// Intensity (0..=1)
    #[clap(long, value_parser = utils::parse_unit)]
    pub energy: f64,

    /// Danceability (0..=1); accepted but not used by the current rules
    #[clap(long, default_value = "0", value_parser = utils::parse_unit)]
    pub danceability: f64,
}

#[derive(Parser, Debug, Clone)]
#[clap(group(ArgGroup::new("source").required(true).args(["tracks", "recent", "top"])))]
pub struct FilterOptions {
    /// Mood to select
    #[clap(long)]
    pub mood: Mood,

    /// Path to a JSON array of tracks
    #[clap(long)]
    pub tracks: Option<PathBuf>,

    /// Use your recently played tracks
    #[clap(long)]
    pub recent: bool,

    /// Use your top tracks
    #[clap(long)]
    pub top: bool,

    /// Ranking window for --top: short_term, medium_term or long_term
    #[clap(long, default_value = "medium_term")]
    pub time_range: TimeRange,

    /// Number of tracks to fetch for --recent or --top
    #[clap(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub limit: u32,

    #[clap(long)]
    pub language: Option<String>,

    #[clap(long)]
    pub artist: Option<String>,

    #[clap(long)]
    pub genre: Option<String>,

    #[clap(long)]
    pub year: Option<i32>,

    /// Inclusive energy range, e.g. 0.2,0.8
    #[clap(long, value_parser = utils::parse_range)]
    pub energy_range: Option<(f64, f64)>,

    /// Inclusive valence range, e.g. 0.5,1
    #[clap(long, value_parser = utils::parse_range)]
    pub valence_range: Option<(f64, f64)>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Login => cli::login().await,
        Command::Status => cli::status().await,
        Command::Token => cli::token().await,
        Command::Logout => cli::logout().await,
        Command::Classify(opt) => cli::classify(AudioFeatureVector {
            valence: opt.valence,
            energy: opt.energy,
            danceability: opt.danceability,
        }),
        Command::Filter(opt) => {
            let constraints = MoodFilter {
                language: opt.language,
                artist: opt.artist,
                genre: opt.genre,
                year: opt.year,
                energy_range: opt.energy_range,
                valence_range: opt.valence_range,
            };
            let input = match (opt.tracks, opt.top) {
                (Some(path), _) => TrackInput::File(path),
                (None, true) => TrackInput::Remote(RemoteTracks::TopTracks {
                    time_range: opt.time_range,
                    limit: opt.limit,
                }),
                (None, false) => {
                    TrackInput::Remote(RemoteTracks::RecentlyPlayed { limit: opt.limit })
                }
            };
            cli::filter(opt.mood, input, constraints).await
        }
        Command::Playing => cli::playing().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
