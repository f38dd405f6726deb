//! Data models for the movie backend.
//!
//! - `Movie`, `MovieRating`, `RatingUpdate`: catalog entries and scores
//! - `WatchlistEntry`, `MovieRef`: watchlist items (populated or bare ids)
//! - `User`, `UserProfile`, `Preferences`: account data
//! - `ProfileUpdate`: validated body for profile edits

mod de;
pub mod movie;
pub mod user;

pub use movie::{Movie, MovieRating, MovieRef, RatingUpdate, WatchlistEntry};
pub use user::{
    AuthResponse, Preferences, PreferencesStatus, ProfileUpdate, ProfileUpdateError,
    SignupResponse, User, UserProfile, PREFERENCE_GENRES, PREFERENCE_LANGUAGES,
};
