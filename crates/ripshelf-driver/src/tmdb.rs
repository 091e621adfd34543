use async_trait::async_trait;
use ripshelf_domain::{MovieCandidate, MovieDetails};
use serde::Deserialize;
use tracing::debug;

use crate::error::DriverError;

/// How many search results the identifier ever looks at.
pub const MAX_CANDIDATES: usize = 10;

/// External title catalog. Implementations may be offline or mocked.
#[async_trait]
pub trait Catalog: Send + Sync + 'static {
    async fn search_movie(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<MovieCandidate>, DriverError>;

    async fn movie_details(&self, id: i64) -> Result<MovieDetails, DriverError>;
}

/// TMDb-backed catalog.
pub struct TmdbCatalog {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TmdbCatalog {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, "https://api.themoviedb.org")
    }

    /// Point at a different host. Used by tests to run against a mock server.
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: i64,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    popularity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    id: i64,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    popularity: Option<f64>,
    #[serde(default)]
    runtime: Option<i64>,
}

/// `"1999-03-31"` → 1999. TMDb sometimes returns an empty string.
fn year_of(release_date: &Option<String>) -> Option<i32> {
    release_date
        .as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok())
}

#[async_trait]
impl Catalog for TmdbCatalog {
    async fn search_movie(
        &self,
        query: &str,
        year: Option<i32>,
    ) -> Result<Vec<MovieCandidate>, DriverError> {
        let url = format!("{}/3/search/movie", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .query(&[("api_key", self.token.as_str()), ("query", query)]);
        if let Some(year) = year {
            request = request.query(&[("year", year.to_string())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DriverError::Catalog(e.to_string()))?
            .error_for_status()
            .map_err(|e| DriverError::Catalog(e.to_string()))?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| DriverError::Catalog(e.to_string()))?;

        debug!(query, results = body.results.len(), "catalog search");
        Ok(body
            .results
            .into_iter()
            .take(MAX_CANDIDATES)
            .map(|r| MovieCandidate {
                catalog_id: r.id,
                title: r.title,
                year: year_of(&r.release_date),
                overview: r.overview.unwrap_or_default(),
                poster_ref: r.poster_path,
                popularity: r.popularity.unwrap_or(0.0),
            })
            .collect())
    }

    async fn movie_details(&self, id: i64) -> Result<MovieDetails, DriverError> {
        let url = format!("{}/3/movie/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.token.as_str())])
            .send()
            .await
            .map_err(|e| DriverError::Catalog(e.to_string()))?
            .error_for_status()
            .map_err(|e| DriverError::Catalog(e.to_string()))?;
        let body: DetailsResponse = response
            .json()
            .await
            .map_err(|e| DriverError::Catalog(e.to_string()))?;

        Ok(MovieDetails {
            catalog_id: body.id,
            title: body.title,
            year: year_of(&body.release_date),
            overview: body.overview.unwrap_or_default(),
            poster_ref: body.poster_path,
            popularity: body.popularity.unwrap_or(0.0),
            runtime_minutes: body.runtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_maps_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/search/movie"))
            .and(query_param("query", "the matrix"))
            .and(query_param("api_key", "t0ken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "results": [{
                    "id": 603,
                    "title": "The Matrix",
                    "release_date": "1999-03-31",
                    "overview": "A computer hacker learns the truth.",
                    "poster_path": "/matrix.jpg",
                    "popularity": 100.0
                }]
            })))
            .mount(&server)
            .await;

        let catalog = TmdbCatalog::with_base_url("t0ken", server.uri());
        let candidates = catalog.search_movie("the matrix", None).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].catalog_id, 603);
        assert_eq!(candidates[0].year, Some(1999));
        assert_eq!(candidates[0].poster_ref.as_deref(), Some("/matrix.jpg"));
    }

    #[tokio::test]
    async fn search_passes_year_and_caps_results() {
        let server = MockServer::start().await;
        let many: Vec<_> = (0..20)
            .map(|i| json!({"id": i, "title": format!("Movie {i}"), "popularity": 1.0}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/3/search/movie"))
            .and(query_param("year", "1999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": many })))
            .mount(&server)
            .await;

        let catalog = TmdbCatalog::with_base_url("t0ken", server.uri());
        let candidates = catalog.search_movie("x", Some(1999)).await.unwrap();
        assert_eq!(candidates.len(), MAX_CANDIDATES);
    }

    #[tokio::test]
    async fn missing_fields_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/search/movie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"id": 42, "title": "Obscure", "release_date": ""}]
            })))
            .mount(&server)
            .await;

        let catalog = TmdbCatalog::with_base_url("t0ken", server.uri());
        let candidates = catalog.search_movie("obscure", None).await.unwrap();
        assert_eq!(candidates[0].year, None);
        assert_eq!(candidates[0].popularity, 0.0);
        assert!(candidates[0].overview.is_empty());
    }

    #[tokio::test]
    async fn http_error_is_a_catalog_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/search/movie"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let catalog = TmdbCatalog::with_base_url("bad", server.uri());
        let err = catalog.search_movie("x", None).await.unwrap_err();
        assert!(matches!(err, DriverError::Catalog(_)));
    }

    #[tokio::test]
    async fn details_include_runtime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/movie/603"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 603,
                "title": "The Matrix",
                "release_date": "1999-03-31",
                "runtime": 136,
                "popularity": 100.0
            })))
            .mount(&server)
            .await;

        let catalog = TmdbCatalog::with_base_url("t0ken", server.uri());
        let details = catalog.movie_details(603).await.unwrap();
        assert_eq!(details.runtime_minutes, Some(136));
        assert_eq!(details.year, Some(1999));
    }
}
