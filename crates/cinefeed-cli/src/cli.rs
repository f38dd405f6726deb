//! Command-line interface definition.

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};

use cinefeed_core::models::{PREFERENCE_GENRES, PREFERENCE_LANGUAGES};
use cinefeed_core::StorageBackend;

#[derive(Parser, Debug)]
#[command(name = "cinefeed", version, about = "Browse movies, keep a watchlist and get recommendations")]
pub struct Cli {
    /// Backend API root, e.g. http://localhost:5000/api
    #[arg(long, global = true, env = "CINEFEED_API_URL")]
    pub api_url: Option<String>,

    /// Where to keep the session: file, keyring or memory
    #[arg(long, global = true, env = "CINEFEED_STORAGE")]
    pub storage: Option<StorageBackend>,

    /// Print raw JSON instead of formatted output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the current session
    Whoami,
    /// Featured movies and category rows
    Home,
    /// Browse all movies
    Movies {
        /// Filter by title, genre or language
        #[arg(long, short)]
        search: Option<String>,
        #[arg(long, short, default_value_t = 1)]
        page: usize,
    },
    /// Movies in one category
    Category { name: String },
    /// Details for one movie
    Movie { id: String },
    /// Trailer link for a movie
    Trailer { id: String },
    /// Rate a movie from 1 to 5 stars
    Rate {
        id: String,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        stars: u8,
    },
    /// Manage your watchlist
    Watchlist(WatchlistCommand),
    /// Personal recommendations
    Recommend,
    /// View or edit your profile
    Profile(ProfileCommand),
    /// View or set favourite genres and languages
    Prefs(PrefsCommand),
}

#[derive(Args, Debug)]
pub struct WatchlistCommand {
    #[command(subcommand)]
    pub command: Option<WatchlistSubcommand>,
}

#[derive(Subcommand, Debug)]
pub enum WatchlistSubcommand {
    List,
    Add { id: String },
    Remove { id: String },
    Toggle { id: String },
}

#[derive(Args, Debug)]
pub struct ProfileCommand {
    #[command(subcommand)]
    pub command: Option<ProfileSubcommand>,
}

#[derive(Subcommand, Debug)]
pub enum ProfileSubcommand {
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        /// Prompt for the current and a new password
        #[arg(long)]
        change_password: bool,
    },
}

#[derive(Args, Debug)]
pub struct PrefsCommand {
    #[command(subcommand)]
    pub command: Option<PrefsSubcommand>,
}

#[derive(Subcommand, Debug)]
pub enum PrefsSubcommand {
    Show,
    Set {
        #[arg(long = "genre", value_parser = PossibleValuesParser::new(PREFERENCE_GENRES))]
        genres: Vec<String>,
        #[arg(long = "language", value_parser = PossibleValuesParser::new(PREFERENCE_LANGUAGES))]
        languages: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_movies_flags() {
        let cli = Cli::try_parse_from(["cinefeed", "movies", "--search", "drama", "--page", "2"]).unwrap();
        match cli.command {
            Command::Movies { search, page } => {
                assert_eq!(search.as_deref(), Some("drama"));
                assert_eq!(page, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rate_range() {
        assert!(Cli::try_parse_from(["cinefeed", "rate", "m1", "5"]).is_ok());
        assert!(Cli::try_parse_from(["cinefeed", "rate", "m1", "0"]).is_err());
        assert!(Cli::try_parse_from(["cinefeed", "rate", "m1", "6"]).is_err());
    }

    #[test]
    fn test_prefs_values_are_checked() {
        let cli = Cli::try_parse_from([
            "cinefeed", "prefs", "set", "--genre", "Drama", "--genre", "Sci-Fi", "--language", "Tamil",
        ])
        .unwrap();
        match cli.command {
            Command::Prefs(PrefsCommand { command: Some(PrefsSubcommand::Set { genres, languages }) }) => {
                assert_eq!(genres, vec!["Drama", "Sci-Fi"]);
                assert_eq!(languages, vec!["Tamil"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["cinefeed", "prefs", "set", "--genre", "Opera"]).is_err());
    }

    #[test]
    fn test_storage_flag() {
        let cli = Cli::try_parse_from(["cinefeed", "--storage", "memory", "whoami"]).unwrap();
        assert_eq!(cli.storage, Some(StorageBackend::Memory));
        assert!(Cli::try_parse_from(["cinefeed", "--storage", "cloud", "whoami"]).is_err());
    }
}
