//! Command handlers.
//!
//! `App` owns the configuration and the `MovieApi`. Each subcommand maps to
//! one handler that calls the API and prints the result, either formatted
//! for the terminal or as JSON.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use cinefeed_core::api::AuthError;
use cinefeed_core::catalog::{
    embed_url, featured, filter_movies, in_watchlist, paginate, user_rating, watch_url,
    youtube_video_id, HomeSections, FEATURED_COUNT, MOVIES_PER_PAGE,
};
use cinefeed_core::models::{Movie, MovieRef, Preferences, ProfileUpdate, User, WatchlistEntry};
use cinefeed_core::utils::{format_optional, format_stars, truncate_string};
use cinefeed_core::{
    ApiError, Config, LoginRedirect, MovieApi, RequestGateway, SessionState, SessionStore,
    StorageBackend,
};

use crate::cli::{
    Cli, Command, PrefsCommand, PrefsSubcommand, ProfileCommand, ProfileSubcommand,
    WatchlistCommand, WatchlistSubcommand,
};

/// Title column width in movie listings
const TITLE_WIDTH: usize = 40;

/// Movies shown per home row
const HOME_ROW_LENGTH: usize = 6;

const SESSION_EXPIRED: &str = "Session expired. Run `cinefeed login` to sign in again.";
const NOT_LOGGED_IN: &str = "Not logged in. Run `cinefeed login` first.";

/// Login redirect for a terminal: there is no page to navigate to, so tell
/// the user how to get back in.
#[derive(Debug, Default)]
pub struct TerminalRedirect;

impl LoginRedirect for TerminalRedirect {
    fn redirect_to_login(&self) {
        eprintln!("{}", SESSION_EXPIRED);
    }
}

pub struct App {
    config: Config,
    api: MovieApi,
    storage: StorageBackend,
    json: bool,
}

impl App {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = Config::load().context("Failed to load config")?;
        let storage = cli.storage.unwrap_or(config.storage);

        let session = SessionStore::from_boxed(
            config
                .open_storage(storage)
                .context("Failed to open session storage")?,
        );
        if session.restore() == SessionState::Authenticated {
            debug!(backend = %storage, "Restored session");
        }

        let base_url = config.api_base_url(cli.api_url.as_deref());
        let gateway = RequestGateway::with_timeout(
            &base_url,
            config.request_timeout(),
            Arc::new(session),
            Arc::new(TerminalRedirect),
        )
        .with_context(|| format!("Invalid API URL {}", base_url))?;

        Ok(Self {
            config,
            api: MovieApi::new(gateway),
            storage,
            json: cli.json,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email } => self.login(email).await,
            Command::Signup { name, email } => self.signup(&name, &email).await,
            Command::Logout => self.logout(),
            Command::Whoami => self.whoami(),
            Command::Home => self.home().await,
            Command::Movies { search, page } => self.movies(search.as_deref(), page).await,
            Command::Category { name } => self.category(&name).await,
            Command::Movie { id } => self.movie(&id).await,
            Command::Trailer { id } => self.trailer(&id).await,
            Command::Rate { id, stars } => self.rate(&id, stars).await,
            Command::Watchlist(WatchlistCommand { command }) => {
                self.watchlist(command.unwrap_or(WatchlistSubcommand::List))
                    .await
            }
            Command::Recommend => self.recommend().await,
            Command::Profile(ProfileCommand { command }) => {
                self.profile(command.unwrap_or(ProfileSubcommand::Show))
                    .await
            }
            Command::Prefs(PrefsCommand { command }) => {
                self.prefs(command.unwrap_or(PrefsSubcommand::Show)).await
            }
        }
    }

    /// Protected commands need a session before any request is made.
    fn require_login(&self) -> Result<String> {
        self.api
            .session()
            .user_id()
            .ok_or_else(|| anyhow::anyhow!(NOT_LOGGED_IN))
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    // ===== Session =====

    async fn login(&mut self, email: Option<String>) -> Result<()> {
        let email = match email {
            Some(email) => email,
            None => prompt_line("Email", self.config.last_email.as_deref())?,
        };
        if email.is_empty() {
            bail!("Email is required");
        }
        let password = rpassword::prompt_password("Password: ")?;

        let user = self.api.login(&email, &password).await?;
        info!(user_id = %user.id, "Logged in");

        if self.config.last_email.as_deref() != Some(email.as_str()) {
            self.config.last_email = Some(email.clone());
            if let Err(e) = self.config.save() {
                warn!("Failed to save config: {}", e);
            }
        }

        // New accounts are asked to pick preferences before anything else
        let has_set_preferences = match self.api.preferences().await {
            Ok(status) => Some(status.has_set_preferences),
            Err(e) => {
                debug!("Could not check preferences: {}", e);
                None
            }
        };

        if self.json {
            return self.print_json(&login_summary(&user, has_set_preferences));
        }
        println!(
            "Logged in as {}",
            user.name.as_deref().unwrap_or(email.as_str())
        );
        if has_set_preferences == Some(false) {
            println!("Tip: pick favourite genres and languages with `cinefeed prefs set`.");
        }
        Ok(())
    }

    async fn signup(&mut self, name: &str, email: &str) -> Result<()> {
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if password != confirm {
            bail!("Passwords do not match");
        }

        let user = self.api.signup(name, email, &password).await?;

        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!("Failed to save config: {}", e);
        }

        if self.json {
            return self.print_json(&json!({ "loggedIn": user.is_some(), "user": user }));
        }
        match user {
            Some(user) => println!("Welcome, {}! You are logged in.", user.name.as_deref().unwrap_or(name)),
            None => println!("Account created. Run `cinefeed login` to sign in."),
        }
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        let was_logged_in = self.api.logout().context("Failed to clear stored session")?;
        if self.json {
            return self.print_json(&json!({ "loggedOut": was_logged_in }));
        }
        if was_logged_in {
            println!("Logged out.");
        } else {
            println!("Not logged in.");
        }
        Ok(())
    }

    fn whoami(&self) -> Result<()> {
        let user_id = self.api.session().user_id();
        let api_url = self.api.gateway().base_url().to_string();

        if self.json {
            return self.print_json(&json!({
                "authenticated": user_id.is_some(),
                "userId": user_id,
                "storage": self.storage.to_string(),
                "apiUrl": api_url,
            }));
        }
        match user_id {
            Some(id) => println!("Logged in (user {})", id),
            None => println!("Not logged in"),
        }
        println!("Storage: {}", self.storage);
        println!("API:     {}", api_url);
        Ok(())
    }

    // ===== Movies =====

    async fn home(&self) -> Result<()> {
        let movies = self.api.movies().await?;
        let top = featured(&movies, FEATURED_COUNT);
        let sections = HomeSections::from_movies(&movies);

        if self.json {
            let mut rows = serde_json::Map::new();
            for (name, row) in sections.rows() {
                rows.insert(name.to_string(), serde_json::to_value(row)?);
            }
            return self.print_json(&json!({ "featured": top, "sections": rows }));
        }

        println!("Featured");
        print_movie_rows(&top);
        for (name, row) in sections.rows() {
            if row.is_empty() {
                continue;
            }
            println!();
            println!("{} ({})", capitalize(name), row.len());
            print_movie_rows(&row[..row.len().min(HOME_ROW_LENGTH)]);
        }
        Ok(())
    }

    async fn movies(&self, search: Option<&str>, page: usize) -> Result<()> {
        let movies = self.api.movies().await?;
        let filtered = filter_movies(&movies, search.unwrap_or(""));
        let page = paginate(&filtered, page, MOVIES_PER_PAGE);

        if self.json {
            return self.print_json(&json!({
                "movies": page.items,
                "page": page.page,
                "totalPages": page.total_pages,
                "totalMovies": page.total_items,
            }));
        }

        if page.total_items == 0 {
            println!("No movies found");
            return Ok(());
        }
        print_movie_rows(page.items);
        println!();
        println!(
            "Page {} of {} ({} movies)",
            page.page, page.total_pages, page.total_items
        );
        if page.has_next() {
            println!("Next: cinefeed movies --page {}", page.page + 1);
        }
        Ok(())
    }

    async fn category(&self, name: &str) -> Result<()> {
        let movies = self.api.movies_by_category(name).await?;
        if self.json {
            return self.print_json(&movies);
        }
        if movies.is_empty() {
            println!("No movies in {}", name);
            return Ok(());
        }
        let refs: Vec<&Movie> = movies.iter().collect();
        print_movie_rows(&refs);
        Ok(())
    }

    async fn movie(&self, id: &str) -> Result<()> {
        let movie = self.api.movie(id).await?;
        let user_id = self.api.session().user_id();

        // Watchlist state only matters when logged in; a failure here should
        // not hide the movie itself
        let on_watchlist = match &user_id {
            Some(_) => match self.api.watchlist().await {
                Ok(entries) => Some(in_watchlist(&entries, &movie.id)),
                Err(e) if e.is_unauthorized() => None,
                Err(e) => {
                    debug!("Could not load watchlist: {}", e);
                    None
                }
            },
            None => None,
        };
        let my_rating = user_id.as_deref().and_then(|uid| user_rating(&movie, uid));

        if self.json {
            return self.print_json(&json!({
                "movie": movie,
                "yourRating": my_rating,
                "inWatchlist": on_watchlist,
            }));
        }

        println!("{}", movie.title);
        println!("{}", "=".repeat(movie.title.chars().count()));
        println!("Genre:    {}", movie.genre_display());
        println!("Language: {}", format_optional(&movie.language, "-"));
        println!(
            "Rating:   {} ({} ratings)",
            movie.rating_display(),
            movie.ratings.len()
        );
        if !movie.actors.is_empty() {
            println!("Cast:     {}", movie.actors.join(", "));
        }
        if let Some(rating) = my_rating {
            println!("Yours:    {}", format_stars(rating));
        }
        if let Some(on) = on_watchlist {
            println!("Watchlist: {}", if on { "yes" } else { "no" });
        }
        if let Some(description) = &movie.description {
            println!();
            println!("{}", description);
        }
        Ok(())
    }

    async fn trailer(&self, id: &str) -> Result<()> {
        let movie = self.api.movie(id).await?;
        let video_id = movie.trailer_url.as_deref().and_then(youtube_video_id);

        if self.json {
            return self.print_json(&json!({
                "title": movie.title,
                "trailerUrl": movie.trailer_url,
                "videoId": video_id,
                "watchUrl": video_id.map(watch_url),
                "embedUrl": video_id.map(embed_url),
            }));
        }

        match (video_id, movie.trailer_url.as_deref()) {
            (Some(video_id), _) => println!("{}: {}", movie.title, watch_url(video_id)),
            (None, Some(url)) if !url.is_empty() => {
                println!("{}: {} (not a YouTube link)", movie.title, url)
            }
            _ => println!("No trailer available for {}", movie.title),
        }
        Ok(())
    }

    async fn rate(&self, id: &str, stars: u8) -> Result<()> {
        self.require_login()?;
        let update = self.api.rate_movie(id, stars).await?;
        if self.json {
            return self.print_json(&update);
        }
        match update.rating {
            Some(average) => println!(
                "Rated {}. Average is now {:.1} from {} ratings.",
                format_stars(f64::from(stars)),
                average,
                update.ratings.len()
            ),
            None => println!("Rated {}.", format_stars(f64::from(stars))),
        }
        Ok(())
    }

    // ===== Watchlist =====

    async fn watchlist(&self, command: WatchlistSubcommand) -> Result<()> {
        self.require_login()?;
        match command {
            WatchlistSubcommand::List => {
                let entries = self.api.watchlist().await?;
                if self.json {
                    return self.print_json(&entries);
                }
                if entries.is_empty() {
                    println!("Your watchlist is empty");
                }
                for entry in &entries {
                    println!("{}", watchlist_line(entry));
                }
            }
            WatchlistSubcommand::Add { id } => {
                self.api.add_to_watchlist(&id).await?;
                self.report_watchlist(&id, true)?;
            }
            WatchlistSubcommand::Remove { id } => {
                self.api.remove_from_watchlist(&id).await?;
                self.report_watchlist(&id, false)?;
            }
            WatchlistSubcommand::Toggle { id } => {
                let added = self.api.toggle_watchlist(&id).await?;
                self.report_watchlist(&id, added)?;
            }
        }
        Ok(())
    }

    fn report_watchlist(&self, id: &str, on_watchlist: bool) -> Result<()> {
        if self.json {
            return self.print_json(&json!({ "movieId": id, "inWatchlist": on_watchlist }));
        }
        if on_watchlist {
            println!("Added {} to your watchlist", id);
        } else {
            println!("Removed {} from your watchlist", id);
        }
        Ok(())
    }

    // ===== Recommendations =====

    async fn recommend(&self) -> Result<()> {
        self.require_login()?;
        let feed = self.api.recommendation_feed().await?;

        if self.json {
            return self.print_json(&json!({
                "recommendations": feed.recommendations,
                "watched": feed.watched,
            }));
        }

        if feed.recommendations.is_empty() {
            println!("No recommendations yet. Rate a few movies to get started.");
        } else {
            println!("Recommended for you");
            for movie in &feed.recommendations {
                println!("{}", movie_line(movie));
                if let Some(reason) = &movie.recommendation_reason {
                    println!("    {}", reason);
                }
            }
        }
        if !feed.watched.is_empty() {
            println!();
            println!("Based on what you rated");
            let refs: Vec<&Movie> = feed.watched.iter().collect();
            print_movie_rows(&refs);
        }
        Ok(())
    }

    // ===== Profile =====

    async fn profile(&self, command: ProfileSubcommand) -> Result<()> {
        self.require_login()?;
        match command {
            ProfileSubcommand::Show => {
                let overview = self.api.profile_overview().await?;
                if self.json {
                    return self.print_json(&json!({
                        "profile": overview.profile,
                        "watchlist": overview.watchlist,
                    }));
                }

                let profile = &overview.profile;
                println!("{}", profile.display_name());
                println!("Email:        {}", format_optional(&profile.email, "-"));
                if let Some(since) = profile.member_since() {
                    println!("Member since: {}", since);
                }
                if let Some(prefs) = profile.preferences.as_ref().filter(|p| !p.is_empty()) {
                    println!("Genres:       {}", prefs.genres.join(", "));
                    println!("Languages:    {}", prefs.languages.join(", "));
                }
                println!("Rated:        {} movies", profile.rated_movies.len());
                println!("Watchlist:    {} movies", overview.watchlist.len());
            }
            ProfileSubcommand::Update {
                name,
                change_password,
            } => {
                let name = match name {
                    Some(name) => name,
                    None => self
                        .api
                        .profile()
                        .await?
                        .name
                        .unwrap_or_default(),
                };
                let mut update = ProfileUpdate::rename(&name)?;
                if change_password {
                    let current = rpassword::prompt_password("Current password: ")?;
                    let new = rpassword::prompt_password("New password: ")?;
                    let confirm = rpassword::prompt_password("Confirm new password: ")?;
                    update = update.with_password_change(&current, &new, &confirm)?;
                }

                let profile = self.api.update_profile(&update).await?;
                if self.json {
                    return self.print_json(&profile);
                }
                println!("Profile updated for {}", profile.display_name());
                if update.changes_password() {
                    println!("Password changed.");
                }
            }
        }
        Ok(())
    }

    // ===== Preferences =====

    async fn prefs(&self, command: PrefsSubcommand) -> Result<()> {
        self.require_login()?;
        match command {
            PrefsSubcommand::Show => {
                let status = self.api.preferences().await?;
                if self.json {
                    return self.print_json(&status);
                }
                match status.preferences.filter(|_| status.has_set_preferences) {
                    Some(prefs) => print_preferences(&prefs),
                    None => println!("No preferences set. Use `cinefeed prefs set`."),
                }
            }
            PrefsSubcommand::Set { genres, languages } => {
                let requested = Preferences { genres, languages };
                if requested.is_empty() {
                    bail!("Choose at least one --genre or --language");
                }

                // First-time setup is a POST, later changes a PUT
                let status = self.api.preferences().await?;
                let saved = if status.has_set_preferences {
                    self.api.update_preferences(&requested).await?
                } else {
                    self.api.save_preferences(&requested).await?;
                    requested
                };

                if self.json {
                    return self.print_json(&saved);
                }
                println!("Preferences saved.");
                print_preferences(&saved);
            }
        }
        Ok(())
    }
}

/// User-facing description of a command failure.
pub fn describe_error(err: &anyhow::Error) -> String {
    let api_error = err.downcast_ref::<ApiError>().or_else(|| {
        err.downcast_ref::<AuthError>().and_then(|e| match e {
            AuthError::Api(api) => Some(api),
            AuthError::Session(_) => None,
        })
    });

    match api_error {
        // An ended session was already reported by `TerminalRedirect`
        Some(ApiError::Unauthorized {
            message,
            session_ended,
        }) => match (message, session_ended) {
            (Some(message), _) => message.clone(),
            (None, true) => "Not authorized".to_string(),
            (None, false) => NOT_LOGGED_IN.to_string(),
        },
        Some(ApiError::Unreachable(e)) => {
            format!("Could not reach the server: {}", e)
        }
        Some(ApiError::Rejected { status, message }) => {
            format!("Request rejected ({}): {}", status.as_u16(), message)
        }
        _ => format!("{:#}", err),
    }
}

/// JSON result of `login`. `hasSetPreferences` is null when the check failed.
fn login_summary(user: &User, has_set_preferences: Option<bool>) -> serde_json::Value {
    json!({
        "user": user,
        "hasSetPreferences": has_set_preferences,
    })
}

fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => print!("{} [{}]: ", label, default),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    Ok(if line.is_empty() {
        default.unwrap_or_default().to_string()
    } else {
        line.to_string()
    })
}

fn movie_line(movie: &Movie) -> String {
    format!(
        "{:<24}  {:<width$}  {:>4}  {}",
        movie.id,
        truncate_string(&movie.title, TITLE_WIDTH),
        movie.rating_display(),
        movie.genre_display(),
        width = TITLE_WIDTH
    )
}

fn print_movie_rows(movies: &[&Movie]) {
    for movie in movies {
        println!("{}", movie_line(movie));
    }
}

fn watchlist_line(entry: &WatchlistEntry) -> String {
    let added = entry
        .added_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let line = match &entry.movie {
        Some(MovieRef::Movie(movie)) => format!("{}  {}", movie_line(movie), added),
        Some(MovieRef::Id(id)) => format!("{:<24}  (details unavailable)  {}", id, added),
        None => return "(removed movie)".to_string(),
    };
    line.trim_end().to_string()
}

fn print_preferences(prefs: &Preferences) {
    println!("Genres:    {}", prefs.genres.join(", "));
    println!("Languages: {}", prefs.languages.join(", "));
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
