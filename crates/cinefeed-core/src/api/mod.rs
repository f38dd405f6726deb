//! REST API module for the movie backend.
//!
//! This module provides:
//! - `RequestGateway`: the single pipeline every call goes through. It
//!   injects the bearer token and turns a 401 into a forced logout plus a
//!   `LoginRedirect`.
//! - `MovieApi`: typed endpoints (auth, movies, users, watchlist, ratings,
//!   recommendations) on top of the gateway.

pub mod client;
pub mod error;
pub mod gateway;
pub mod redirect;

pub use client::{AuthError, MovieApi, ProfileOverview, RecommendationFeed, DEFAULT_API_BASE_URL};
pub use error::ApiError;
pub use gateway::{ApiRequest, RequestGateway};
pub use redirect::{LoginRedirect, NoRedirect, RecordingRedirect};
pub use reqwest::{Method, StatusCode};
