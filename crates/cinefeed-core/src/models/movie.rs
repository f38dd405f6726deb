use serde::{Deserialize, Serialize};

use super::de::{deserialize_id, deserialize_optional_id, deserialize_string_or_seq};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    // Mongo documents use "_id", some endpoints return "id"
    #[serde(rename = "_id", alias = "id", deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    // Either "Drama" or ["Drama", "Crime"]
    #[serde(default, deserialize_with = "deserialize_string_or_seq")]
    pub genre: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub ratings: Vec<MovieRating>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_seq")]
    pub actors: Vec<String>,
    #[serde(rename = "trailerUrl", default)]
    pub trailer_url: Option<String>,
    #[serde(rename = "recommendationReason", default)]
    pub recommendation_reason: Option<String>,
}

impl Movie {
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genre.iter().any(|g| g == genre)
    }

    pub fn genre_display(&self) -> String {
        self.genre.join(", ")
    }

    /// Average rating for display, "-" when unrated
    pub fn rating_display(&self) -> String {
        match self.rating {
            Some(r) => format!("{:.1}", r),
            None => "-".to_string(),
        }
    }
}

/// One user's score as embedded in a movie document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRating {
    #[serde(rename = "userId", default, deserialize_with = "deserialize_optional_id")]
    pub user_id: Option<String>,
    pub score: f64,
}

/// Response of `POST /movies/{id}/rate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingUpdate {
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub ratings: Vec<MovieRating>,
}

/// A watchlist item's movie: populated document or bare id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MovieRef {
    Movie(Box<Movie>),
    Id(String),
}

impl MovieRef {
    pub fn id(&self) -> &str {
        match self {
            MovieRef::Movie(movie) => &movie.id,
            MovieRef::Id(id) => id,
        }
    }

    pub fn movie(&self) -> Option<&Movie> {
        match self {
            MovieRef::Movie(movie) => Some(movie),
            MovieRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistEntry {
    // Entries for deleted movies come back with a null movieId
    #[serde(rename = "movieId", default)]
    pub movie: Option<MovieRef>,
    #[serde(rename = "addedAt", default)]
    pub added_at: Option<String>,
}

impl WatchlistEntry {
    pub fn movie_id(&self) -> Option<&str> {
        self.movie.as_ref().map(MovieRef::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movie_with_genre_array() {
        let json = r#"{
            "_id": "64f0c2a1b2c3d4e5f6a7b8c9",
            "title": "Inception",
            "description": "A thief who steals corporate secrets",
            "genre": ["Action", "Science Fiction"],
            "language": "English",
            "rating": 4.6,
            "ratings": [{"userId": "u1", "score": 5}, {"userId": "u2", "score": 4.2}],
            "poster": "https://example.com/inception.jpg",
            "actors": ["Leonardo DiCaprio"],
            "trailerUrl": "https://www.youtube.com/watch?v=YoHD9XEInc0"
        }"#;

        let movie: Movie = serde_json::from_str(json).expect("parse movie");
        assert_eq!(movie.id, "64f0c2a1b2c3d4e5f6a7b8c9");
        assert_eq!(movie.genre, vec!["Action", "Science Fiction"]);
        assert!(movie.has_genre("Action"));
        assert!(!movie.has_genre("action"));
        assert_eq!(movie.ratings.len(), 2);
        assert_eq!(movie.ratings[1].user_id.as_deref(), Some("u2"));
        assert_eq!(movie.rating_display(), "4.6");
        assert_eq!(movie.genre_display(), "Action, Science Fiction");
    }

    #[test]
    fn test_parse_movie_minimal_and_genre_string() {
        let json = r#"{"id": 42, "title": "Sholay", "genre": "Action", "rating": null}"#;
        let movie: Movie = serde_json::from_str(json).expect("parse movie");
        assert_eq!(movie.id, "42");
        assert_eq!(movie.genre, vec!["Action"]);
        assert!(movie.ratings.is_empty());
        assert_eq!(movie.rating_display(), "-");
    }

    #[test]
    fn test_parse_watchlist_entries() {
        let json = r#"[
            {"movieId": {"_id": "m1", "title": "Dangal", "genre": ["Drama"]}, "addedAt": "2024-03-01T10:00:00Z"},
            {"movieId": "m2"},
            {"movieId": null}
        ]"#;
        let entries: Vec<WatchlistEntry> = serde_json::from_str(json).expect("parse watchlist");
        assert_eq!(entries[0].movie_id(), Some("m1"));
        assert_eq!(
            entries[0].movie.as_ref().and_then(MovieRef::movie).map(|m| m.title.as_str()),
            Some("Dangal")
        );
        assert_eq!(entries[1].movie_id(), Some("m2"));
        assert_eq!(entries[2].movie_id(), None);
    }

    #[test]
    fn test_parse_rating_update() {
        let json = r#"{"rating": 4.25, "ratings": [{"userId": "u1", "score": 4}]}"#;
        let update: RatingUpdate = serde_json::from_str(json).expect("parse rating update");
        assert_eq!(update.rating, Some(4.25));
        assert_eq!(update.ratings[0].score, 4.0);
    }
}
