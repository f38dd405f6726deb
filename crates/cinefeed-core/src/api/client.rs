//! Typed endpoints of the movie backend.
//!
//! `MovieApi` turns each backend route into a method. All calls go through
//! the `RequestGateway`, so authentication plumbing never leaks into callers.

use serde::Serialize;
use tracing::{debug, info};

use super::{ApiError, ApiRequest, RequestGateway};
use crate::auth::{Credential, SessionError, SessionStore};
use crate::models::{
    AuthResponse, Movie, Preferences, PreferencesStatus, ProfileUpdate, RatingUpdate,
    SignupResponse, User, UserProfile, WatchlistEntry,
};

/// Default backend root used when nothing is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RateBody {
    rating: u8,
}

#[derive(Debug, Serialize)]
struct WatchlistBody<'a> {
    #[serde(rename = "movieId")]
    movie_id: &'a str,
}

/// Failure of a login/signup exchange.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to store session: {0}")]
    Session(#[from] SessionError),
}

/// Recommendations together with what the user already watched.
#[derive(Debug, Clone)]
pub struct RecommendationFeed {
    pub recommendations: Vec<Movie>,
    pub watched: Vec<Movie>,
}

/// Profile together with the watchlist.
#[derive(Debug, Clone)]
pub struct ProfileOverview {
    pub profile: UserProfile,
    pub watchlist: Vec<WatchlistEntry>,
}

/// Clone is cheap - it only clones the gateway handle.
#[derive(Clone)]
pub struct MovieApi {
    gateway: RequestGateway,
}

impl MovieApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn session(&self) -> &SessionStore {
        self.gateway.session()
    }

    // ===== Authentication =====

    /// Exchange email/password for a token and log the session in.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let request = ApiRequest::post("/auth/login").json(&LoginBody { email, password })?;
        let auth: AuthResponse = self.gateway.send(request).await?;

        self.session()
            .login(Credential::new(auth.token, auth.user.id.clone()))?;
        Ok(auth.user)
    }

    /// Create an account. Returns the logged-in user when the backend
    /// issues a token straight away, `None` when a separate login is needed.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let request =
            ApiRequest::post("/auth/signup").json(&SignupBody { name, email, password })?;
        let response: SignupResponse = self.gateway.send(request).await?;

        match (response.token, response.user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                self.session().login(Credential::new(token, user.id.clone()))?;
                Ok(Some(user))
            }
            _ => {
                debug!(message = ?response.message, "Signup did not return a session");
                Ok(None)
            }
        }
    }

    /// End the session locally. The backend keeps no session state.
    pub fn logout(&self) -> Result<bool, SessionError> {
        self.session().logout()
    }

    // ===== Movies =====

    pub async fn movies(&self) -> Result<Vec<Movie>, ApiError> {
        self.gateway.send(ApiRequest::get("/movies")).await
    }

    pub async fn movie(&self, id: &str) -> Result<Movie, ApiError> {
        self.gateway.send(ApiRequest::get(format!("/movies/{}", id))).await
    }

    pub async fn movies_by_category(&self, category: &str) -> Result<Vec<Movie>, ApiError> {
        self.gateway
            .send(ApiRequest::get(format!("/movies/category/{}", category)))
            .await
    }

    /// Rate a movie (1-5 stars). Returns the new average and all scores.
    pub async fn rate_movie(&self, id: &str, rating: u8) -> Result<RatingUpdate, ApiError> {
        if !(1..=5).contains(&rating) {
            return Err(ApiError::InvalidRequest(format!(
                "Rating must be between 1 and 5, got {}",
                rating
            )));
        }
        let request = ApiRequest::post(format!("/movies/{}/rate", id)).json(&RateBody { rating })?;
        let update = self.gateway.send(request).await?;
        info!(movie_id = id, rating, "Rated movie");
        Ok(update)
    }

    // ===== Recommendations =====

    pub async fn recommendations(&self) -> Result<Vec<Movie>, ApiError> {
        self.gateway.send(ApiRequest::get("/recommend")).await
    }

    pub async fn watched_movies(&self) -> Result<Vec<Movie>, ApiError> {
        self.gateway.send(ApiRequest::get("/users/watched-movies")).await
    }

    /// Fetch recommendations and watched movies concurrently.
    pub async fn recommendation_feed(&self) -> Result<RecommendationFeed, ApiError> {
        let (recommendations, watched) =
            futures::try_join!(self.recommendations(), self.watched_movies())?;
        Ok(RecommendationFeed {
            recommendations,
            watched,
        })
    }

    // ===== Profile & preferences =====

    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.gateway.send(ApiRequest::get("/users/profile")).await
    }

    /// Fetch profile and watchlist concurrently.
    pub async fn profile_overview(&self) -> Result<ProfileOverview, ApiError> {
        let (profile, watchlist) = futures::try_join!(self.profile(), self.watchlist())?;
        Ok(ProfileOverview { profile, watchlist })
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let request = ApiRequest::put("/users/update").json(update)?;
        self.gateway.send(request).await
    }

    pub async fn preferences(&self) -> Result<PreferencesStatus, ApiError> {
        self.gateway.send(ApiRequest::get("/users/preferences")).await
    }

    /// First-time preference setup (after login)
    pub async fn save_preferences(&self, preferences: &Preferences) -> Result<(), ApiError> {
        let request = ApiRequest::post("/users/preferences").json(preferences)?;
        self.gateway.send::<serde_json::Value>(request).await?;
        Ok(())
    }

    /// Change existing preferences; returns what the backend stored.
    pub async fn update_preferences(
        &self,
        preferences: &Preferences,
    ) -> Result<Preferences, ApiError> {
        #[derive(serde::Deserialize)]
        struct UpdatedPreferences {
            #[serde(default)]
            preferences: Option<Preferences>,
        }

        let request = ApiRequest::put("/users/preferences").json(preferences)?;
        let updated: UpdatedPreferences = self.gateway.send(request).await?;
        Ok(updated.preferences.unwrap_or_else(|| preferences.clone()))
    }

    // ===== Watchlist =====

    pub async fn watchlist(&self) -> Result<Vec<WatchlistEntry>, ApiError> {
        self.gateway.send(ApiRequest::get("/users/watchlist")).await
    }

    pub async fn add_to_watchlist(&self, movie_id: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post("/users/watchlist").json(&WatchlistBody { movie_id })?;
        self.gateway.send::<serde_json::Value>(request).await?;
        Ok(())
    }

    pub async fn remove_from_watchlist(&self, movie_id: &str) -> Result<(), ApiError> {
        self.gateway
            .send::<serde_json::Value>(ApiRequest::delete(format!("/users/watchlist/{}", movie_id)))
            .await?;
        Ok(())
    }

    /// Add the movie if missing, remove it if present. Returns whether the
    /// movie is on the watchlist afterwards.
    pub async fn toggle_watchlist(&self, movie_id: &str) -> Result<bool, ApiError> {
        let watchlist = self.watchlist().await?;
        if crate::catalog::in_watchlist(&watchlist, movie_id) {
            self.remove_from_watchlist(movie_id).await?;
            Ok(false)
        } else {
            self.add_to_watchlist(movie_id).await?;
            Ok(true)
        }
    }
}
