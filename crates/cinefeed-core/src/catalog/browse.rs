use crate::models::{Movie, WatchlistEntry};
use crate::utils::contains_ignore_case;

/// Movies shown per page when browsing
pub const MOVIES_PER_PAGE: usize = 12;

/// Number of top-rated movies highlighted on the home view
pub const FEATURED_COUNT: usize = 5;

/// Case-insensitive match on title, any genre, or language.
/// An empty term matches everything.
pub fn matches_search(movie: &Movie, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    contains_ignore_case(&movie.title, term)
        || movie.genre.iter().any(|g| contains_ignore_case(g, term))
        || movie
            .language
            .as_deref()
            .map(|l| contains_ignore_case(l, term))
            .unwrap_or(false)
}

pub fn filter_movies<'a>(movies: &'a [Movie], term: &str) -> Vec<&'a Movie> {
    movies.iter().filter(|m| matches_search(m, term)).collect()
}

/// One page of a list. Pages are 1-based.
#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<'_, T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Slice out page `page` (1-based; 0 is treated as 1). There is always at
/// least one page; pages past the end are empty.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total_pages = items.len().div_ceil(per_page).max(1);

    let start = (page - 1).saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());

    Page {
        items: &items[start..end],
        page,
        total_pages,
        total_items: items.len(),
    }
}

/// Top `count` movies by average rating; unrated movies count as 0.
pub fn featured(movies: &[Movie], count: usize) -> Vec<&Movie> {
    let mut sorted: Vec<&Movie> = movies.iter().collect();
    // Stable sort keeps backend order among equal ratings
    sorted.sort_by(|a, b| {
        b.rating
            .unwrap_or(0.0)
            .total_cmp(&a.rating.unwrap_or(0.0))
    });
    sorted.truncate(count);
    sorted
}

/// Movies grouped into the rows of the home view.
#[derive(Debug, Default)]
pub struct HomeSections<'a> {
    pub hindi: Vec<&'a Movie>,
    pub english: Vec<&'a Movie>,
    pub action: Vec<&'a Movie>,
    pub drama: Vec<&'a Movie>,
    pub comedy: Vec<&'a Movie>,
    pub thriller: Vec<&'a Movie>,
}

impl<'a> HomeSections<'a> {
    pub fn from_movies(movies: &'a [Movie]) -> Self {
        let by_language = |lang: &str| -> Vec<&'a Movie> {
            movies
                .iter()
                .filter(|m| m.language.as_deref() == Some(lang))
                .collect()
        };
        let by_genre = |genre: &str| -> Vec<&'a Movie> {
            movies.iter().filter(|m| m.has_genre(genre)).collect()
        };

        Self {
            hindi: by_language("Hindi"),
            english: by_language("English"),
            action: by_genre("Action"),
            drama: by_genre("Drama"),
            comedy: by_genre("Comedy"),
            thriller: by_genre("Thriller"),
        }
    }

    /// Rows in display order with their category slug
    pub fn rows(&self) -> [(&'static str, &[&'a Movie]); 6] {
        [
            ("hindi", self.hindi.as_slice()),
            ("english", self.english.as_slice()),
            ("action", self.action.as_slice()),
            ("drama", self.drama.as_slice()),
            ("comedy", self.comedy.as_slice()),
            ("thriller", self.thriller.as_slice()),
        ]
    }
}

/// The score `user_id` gave this movie, if any.
pub fn user_rating(movie: &Movie, user_id: &str) -> Option<f64> {
    movie
        .ratings
        .iter()
        .find(|r| r.user_id.as_deref() == Some(user_id))
        .map(|r| r.score)
}

pub fn in_watchlist(entries: &[WatchlistEntry], movie_id: &str) -> bool {
    entries.iter().any(|e| e.movie_id() == Some(movie_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MovieRating, MovieRef};

    fn movie(id: &str, title: &str, genre: &[&str], language: &str, rating: Option<f64>) -> Movie {
        Movie {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            genre: genre.iter().map(|g| g.to_string()).collect(),
            language: Some(language.to_string()),
            rating,
            ratings: Vec::new(),
            poster: None,
            actors: Vec::new(),
            trailer_url: None,
            recommendation_reason: None,
        }
    }

    fn sample() -> Vec<Movie> {
        vec![
            movie("m1", "Dangal", &["Drama", "Sport"], "Hindi", Some(4.8)),
            movie("m2", "Inception", &["Action", "Thriller"], "English", Some(4.6)),
            movie("m3", "Hera Pheri", &["Comedy"], "Hindi", None),
            movie("m4", "Drishyam", &["Thriller", "Drama"], "Malayalam", Some(4.7)),
            movie("m5", "The Hangover", &["Comedy"], "English", Some(3.9)),
            movie("m6", "Andhadhun", &["Thriller"], "Hindi", Some(4.5)),
        ]
    }

    #[test]
    fn test_matches_search_fields() {
        let movies = sample();
        assert!(matches_search(&movies[1], "incep"));
        assert!(matches_search(&movies[1], "THRILL"));
        assert!(matches_search(&movies[0], "hindi"));
        assert!(!matches_search(&movies[0], "comedy"));
        assert!(matches_search(&movies[0], "  "));
    }

    #[test]
    fn test_filter_movies() {
        let movies = sample();
        let ids: Vec<&str> = filter_movies(&movies, "thriller").iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m4", "m6"]);
        assert_eq!(filter_movies(&movies, "").len(), movies.len());
        assert!(filter_movies(&movies, "zzz").is_empty());
    }

    #[test]
    fn test_paginate() {
        let items: Vec<u32> = (1..=30).collect();

        let first = paginate(&items, 1, MOVIES_PER_PAGE);
        assert_eq!(first.items, &items[0..12]);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next());
        assert!(!first.has_prev());

        let last = paginate(&items, 3, MOVIES_PER_PAGE);
        assert_eq!(last.items, &items[24..30]);
        assert!(!last.has_next());

        assert!(paginate(&items, 4, MOVIES_PER_PAGE).items.is_empty());
        assert_eq!(paginate(&items, 0, MOVIES_PER_PAGE).page, 1);
    }

    #[test]
    fn test_paginate_empty() {
        let items: Vec<u32> = Vec::new();
        let page = paginate(&items, 1, MOVIES_PER_PAGE);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_items, 0);
    }

    #[test]
    fn test_featured_orders_by_rating() {
        let movies = sample();
        let ids: Vec<&str> = featured(&movies, FEATURED_COUNT).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m4", "m2", "m6", "m5"]);
        assert_eq!(featured(&movies, 10).len(), movies.len());
    }

    #[test]
    fn test_home_sections() {
        let movies = sample();
        let sections = HomeSections::from_movies(&movies);
        assert_eq!(sections.hindi.len(), 3);
        assert_eq!(sections.english.len(), 2);
        assert_eq!(sections.action.len(), 1);
        assert_eq!(sections.drama.len(), 2);
        assert_eq!(sections.comedy.len(), 2);
        assert_eq!(sections.thriller.len(), 3);
        assert_eq!(sections.rows()[0].0, "hindi");
    }

    #[test]
    fn test_user_rating() {
        let mut m = movie("m1", "Dangal", &["Drama"], "Hindi", Some(4.5));
        m.ratings = vec![
            MovieRating { user_id: Some("u1".to_string()), score: 5.0 },
            MovieRating { user_id: None, score: 1.0 },
        ];
        assert_eq!(user_rating(&m, "u1"), Some(5.0));
        assert_eq!(user_rating(&m, "u2"), None);
    }

    #[test]
    fn test_in_watchlist() {
        let entries = vec![
            WatchlistEntry { movie: Some(MovieRef::Id("m1".to_string())), added_at: None },
            WatchlistEntry { movie: None, added_at: None },
        ];
        assert!(in_watchlist(&entries, "m1"));
        assert!(!in_watchlist(&entries, "m2"));
    }
}
