//! Shared item models
//!
//! `ListItem` is the candidate entity pulled from an external list. It is filled in by
//! a list source, completed once by enrichment and read-only afterwards.

use serde::{Deserialize, Serialize};

/// Rating scores from the three named rating sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    /// Internet Movie Database score (0.0-10.0)
    pub imdb: f64,
    /// Metacritic score (0-100)
    pub metacritic: i64,
    /// Rotten Tomatoes score (0-100)
    pub rotten_tomatoes: i64,
}

/// Candidate entity extracted from a list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    /// Title as published by the list (or guessed from a release name)
    pub title: String,
    /// Release year, 0 when unknown
    pub year: u32,
    /// Primary catalog id (IMDb `tt...`), empty when unknown
    pub imdb: String,
    /// Secondary numeric id (TMDb), 0 when unknown
    pub tmdb: u64,
    /// Number of IMDb votes
    pub imdb_votes: i64,
    /// Genres
    pub genre: Vec<String>,
    /// Spoken languages
    pub language: Vec<String>,
    /// Runtime in minutes
    pub runtime: i64,
    /// Scores per rating source
    pub ratings: Ratings,
    /// How many rating sources reported a score
    pub count_ratings: i64,
}

impl ListItem {
    /// Minimal item as produced by list sources
    pub fn new(title: impl Into<String>, year: u32) -> Self {
        Self {
            title: title.into(),
            year,
            ..Default::default()
        }
    }

    pub fn with_imdb(mut self, imdb: impl Into<String>) -> Self {
        self.imdb = imdb.into();
        self
    }

    pub fn with_tmdb(mut self, tmdb: u64) -> Self {
        self.tmdb = tmdb;
        self
    }

    /// Stable identity used for deduplication
    ///
    /// Primary id when present, else the namespaced secondary id, else the
    /// normalized title plus year.
    pub fn identity_key(&self) -> String {
        if !self.imdb.is_empty() {
            self.imdb.clone()
        } else if self.tmdb > 0 {
            tmdb_key(self.tmdb)
        } else {
            format!("{}:{}", title_key(&self.title), self.year)
        }
    }

    /// Copy enrichment results into the item
    ///
    /// A primary id found by the rating service replaces a missing one; all other
    /// fields are overwritten.
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        if let Some(imdb) = enrichment.imdb.filter(|id| !id.is_empty()) {
            self.imdb = imdb;
        }
        self.imdb_votes = enrichment.imdb_votes;
        self.genre = enrichment.genre;
        self.language = enrichment.language;
        self.runtime = enrichment.runtime;
        self.ratings = enrichment.ratings;
        self.count_ratings = enrichment.count_ratings;
    }

    /// Short human label, e.g. `Arrival (2016)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.title, self.year)
    }
}

/// Fields populated by a rating/metadata service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub imdb: Option<String>,
    pub imdb_votes: i64,
    pub genre: Vec<String>,
    pub language: Vec<String>,
    pub runtime: i64,
    pub ratings: Ratings,
    pub count_ratings: i64,
}

/// Image attached to a movie candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieImage {
    pub cover_type: String,
    pub url: String,
}

/// Concrete addable entity resolved by the movie sink
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieCandidate {
    pub title: String,
    #[serde(default)]
    pub title_slug: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub imdb_id: String,
    #[serde(default)]
    pub tmdb_id: u64,
    #[serde(default)]
    pub images: Vec<MovieImage>,
}

/// Namespaced key for a secondary (TMDb) id
pub fn tmdb_key(id: u64) -> String {
    format!("tmdb:{}", id)
}

/// Namespaced key for a title
pub fn title_key(title: &str) -> String {
    format!("title:{}", slugify(title))
}

/// Lowercase alphanumeric words joined by single dashes
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.extend(word.chars().flat_map(char::to_lowercase));
    }
    slug
}
