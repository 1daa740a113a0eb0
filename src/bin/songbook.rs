use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};

use songbook_server::config::Config;
use songbook_server::error::LibraryError;
use songbook_server::http_client::LibraryApiClient;
use songbook_server::library::{Annotation, LibrarySong, SongPatch};
use songbook_server::logger::{self, Output};
use songbook_server::reconciler::Reconciler;

type LibraryReconciler = Reconciler<LibraryApiClient, LibraryApiClient>;

#[derive(Parser, Debug)]
#[command(name = "songbook", version, about = "Search Spotify and manage your music library")]
struct CliArgs {
    /// Base URL of the library API. Defaults to LIBRARY_URL.
    #[arg(long)]
    url: Option<String>,

    /// Log at LOG_LEVEL instead of warnings only. Logs go to stderr.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Searches the Spotify catalog for tracks.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Lists library songs, optionally only those of one genre.
    List {
        #[arg(long)]
        genre: Option<String>,
    },

    /// Searches for `query` and adds the result with the given Spotify id to the library.
    Import {
        spotify_id: String,
        #[arg(long)]
        query: String,
        #[arg(long)]
        genre: String,
        #[arg(long, allow_hyphen_values = true)]
        rating: i32,
        #[arg(long)]
        summary: Option<String>,
    },

    /// Changes the genre, rating and/or summary of a song.
    Update {
        id: i32,
        #[arg(long)]
        genre: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        rating: Option<i32>,
        #[arg(long)]
        summary: Option<String>,
    },

    /// Removes a song from the library.
    Delete { id: i32 },

    /// Lists the genres present in the library.
    Genres,

    /// Shows library statistics.
    Stats,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenv::dotenv();
    let args = CliArgs::parse();
    let config = Config::from_env();
    if let Err(e) = logger::init_to(log_level(args.verbose, config.log_level), Output::Stderr) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let url = args.url.clone().unwrap_or_else(|| config.library_url.clone());
    let client = match LibraryApiClient::new(&url, config.request_timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let search_limit = match &args.command {
        Command::Search { limit: Some(limit), .. } => *limit,
        _ => config.search_limit,
    };
    let reconciler = Reconciler::new(client.clone(), client).with_search_limit(search_limit);

    match run(&reconciler, args.command).await {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            debug!("command failed: {:?}", e);
            eprintln!("{}", describe(&e));
            ExitCode::FAILURE
        }
    }
}

fn log_level(verbose: bool, configured: LevelFilter) -> LevelFilter {
    if verbose {
        configured
    } else {
        configured.min(LevelFilter::Warn)
    }
}

/// Runs one command and returns the lines to print on success.
async fn run(reconciler: &LibraryReconciler, command: Command) -> Result<Vec<String>, LibraryError> {
    let mut lines = Vec::new();

    match command {
        Command::Search { query, .. } => {
            let candidates = reconciler.search(&query).await?;
            if candidates.is_empty() {
                lines.push(format!("No tracks found for {:?}", query));
            }
            for candidate in candidates {
                lines.push(format!(
                    "{}  {} - {} ({}, {})",
                    candidate.id,
                    candidate.title,
                    candidate.artist,
                    candidate.album,
                    format_duration(candidate.duration)
                ));
            }
        }
        Command::List { genre } => {
            let songs = reconciler.list_songs(genre.as_deref()).await?;
            if songs.is_empty() {
                lines.push("No songs in your library yet".to_string());
            }
            for song in &songs {
                push_song(&mut lines, song);
            }
        }
        Command::Import { spotify_id, query, genre, rating, summary } => {
            let candidates = reconciler.search(&query).await?;
            let candidate = candidates
                .iter()
                .find(|candidate| candidate.id == spotify_id)
                .ok_or_else(|| {
                    LibraryError::NotFound(format!("No result for {:?} has id {}", query, spotify_id))
                })?;

            let song = reconciler
                .import_candidate(candidate, &Annotation { genre, rating, summary })
                .await?;
            lines.push("Song added successfully!".to_string());
            push_song(&mut lines, &song);
        }
        Command::Update { id, genre, rating, summary } => {
            let song = reconciler
                .update_song(id, &SongPatch { genre, rating, summary })
                .await?;
            push_song(&mut lines, &song);
        }
        Command::Delete { id } => match reconciler.delete_song(id).await {
            Ok(()) => lines.push(format!("Song {} deleted", id)),
            Err(LibraryError::NotFound(_)) => lines.push(format!("Song {} already deleted", id)),
            Err(e) => return Err(e),
        },
        Command::Genres => {
            lines.extend(reconciler.genres().await?);
        }
        Command::Stats => {
            let stats = reconciler.stats().await?;
            lines.push(format!("Total songs:    {}", stats.total_songs));
            lines.push(format!("Average rating: {:.1}", stats.average_rating));
            lines.push(format!("Genres:         {}", stats.genres.len()));
            for entry in &stats.genre_counts {
                lines.push(format!("  {:<20} {}", entry.genre, entry.count));
            }
        }
    }

    Ok(lines)
}

fn push_song(lines: &mut Vec<String>, song: &LibrarySong) {
    lines.push(format!(
        "#{:<4} [{}] {} - {} ({}/10)",
        song.id, song.genre, song.title, song.artist, song.rating
    ));
    if !song.summary.is_empty() {
        lines.push(format!("      {}", song.summary));
    }
}

fn format_duration(millis: i32) -> String {
    let seconds = millis.max(0) / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn describe(e: &LibraryError) -> String {
    match e {
        LibraryError::InvalidInput(message) => message.clone(),
        LibraryError::DuplicateEntry(_) => {
            "Failed to add song. It already exists in your library.".to_string()
        }
        LibraryError::NotFound(message) => message.clone(),
        LibraryError::UpstreamUnavailable(message) => format!(
            "Library service unavailable ({}). Make sure the server is running and Spotify credentials are set.",
            message
        ),
    }
}
