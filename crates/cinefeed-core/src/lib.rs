//! Core library for cinefeed.
//!
//! Owns everything a front-end needs to talk to the movie backend:
//!
//! - `auth`: `SessionStore` and the durable storage behind it
//! - `api`: `RequestGateway` (credential injection, 401 handling) and the
//!   typed `MovieApi` endpoints
//! - `models`: wire types for movies, users and watchlists
//! - `catalog`: derived views (search, pagination, home sections, trailers)
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiError, ApiRequest, LoginRedirect, MovieApi, RequestGateway};
pub use auth::{Credential, SessionState, SessionStore};
pub use config::{Config, StorageBackend};
