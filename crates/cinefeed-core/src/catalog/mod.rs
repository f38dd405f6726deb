//! Derived views over backend data.
//!
//! Everything here is pure: it takes already-fetched movies or watchlist
//! entries and shapes them for display (search, paging, home sections,
//! trailer links).

pub mod browse;
pub mod trailer;

pub use browse::{
    featured, filter_movies, in_watchlist, matches_search, paginate, user_rating, HomeSections,
    Page, FEATURED_COUNT, MOVIES_PER_PAGE,
};
pub use trailer::{embed_url, watch_url, youtube_video_id};
