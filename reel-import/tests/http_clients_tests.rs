//! HTTP collaborators against mock servers

use reel_common::config::{
    GuessItConfig, ListConfig, OmdbConfig, RadarrConfig, TraktConfig, WebhookConfig,
};
use reel_common::events::{EventType, ImportEvent};
use reel_common::{ListItem, MovieCandidate};
use reel_import::clients::{GuessItClient, OmdbClient, RadarrClient, TraktClient};
use reel_import::error::ClientError;
use reel_import::notification::{Dispatcher, GotifyAgent, SlackAgent, WebhookAgent};
use reel_import::sources::{RssSource, TraktSource};
use reel_import::types::{Enricher, ListSource, MovieSink};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Radarr
// ============================================================================

fn radarr_config(url: &str) -> RadarrConfig {
    RadarrConfig {
        url: url.to_string(),
        api_key: "radarr-key".to_string(),
        root_folder: "/movies".to_string(),
        quality: "hd-1080p".to_string(),
        minimum_availability: "released".to_string(),
        monitored: true,
        search_for_movie: true,
    }
}

async fn mount_radarr_handshake(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v3/system/status"))
        .and(header("X-Api-Key", "radarr-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": "5.2.6.8376"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/qualityprofile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Any"},
            {"id": 4, "name": "HD-1080p"}
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_radarr_connect_resolves_quality_profile() {
    let server = MockServer::start().await;
    mount_radarr_handshake(&server).await;

    let client = RadarrClient::connect(reqwest::Client::new(), &radarr_config(&server.uri()))
        .await
        .unwrap();
    assert_eq!(client.quality_profile_id(), 4);
}

#[tokio::test]
async fn test_radarr_connect_rejects_unknown_profile() {
    let server = MockServer::start().await;
    mount_radarr_handshake(&server).await;

    let mut config = radarr_config(&server.uri());
    config.quality = "Ultra-HD".to_string();
    let err = RadarrClient::connect(reqwest::Client::new(), &config)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ClientError::Config(_)));
}

#[tokio::test]
async fn test_radarr_inventory_keys() {
    let server = MockServer::start().await;
    mount_radarr_handshake(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v3/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"title": "Heat", "imdbId": "tt0113277", "tmdbId": 949},
            {"title": "Obscure", "tmdbId": 12345}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/exclusions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"movieTitle": "Cats", "movieYear": 2019, "tmdbId": 536869}
        ])))
        .mount(&server)
        .await;

    let client = RadarrClient::connect(reqwest::Client::new(), &radarr_config(&server.uri()))
        .await
        .unwrap();

    assert_eq!(
        client.list_existing().await.unwrap(),
        vec!["tt0113277", "tmdb:949", "tmdb:12345"]
    );
    assert_eq!(
        client.list_excluded().await.unwrap(),
        vec!["title:cats", "tmdb:536869"]
    );
}

#[tokio::test]
async fn test_radarr_lookup_prefers_tmdb() {
    let server = MockServer::start().await;
    mount_radarr_handshake(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v3/movie/lookup/tmdb"))
        .and(query_param("tmdbId", "438631"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Dune",
            "titleSlug": "dune-438631",
            "year": 2021,
            "imdbId": "tt1160419",
            "tmdbId": 438631,
            "images": [{"coverType": "poster", "url": "https://image.tmdb.org/dune.jpg"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/movie/lookup/imdb"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = RadarrClient::connect(reqwest::Client::new(), &radarr_config(&server.uri()))
        .await
        .unwrap();

    let dune = ListItem::new("Dune", 2021)
        .with_imdb("tt1160419")
        .with_tmdb(438631);
    let movie = client.lookup(&dune).await.unwrap();
    assert_eq!(movie.title_slug, "dune-438631");
    assert_eq!(movie.images[0].cover_type, "poster");

    let missing = ListItem::new("Missing", 2020).with_imdb("tt0000000");
    assert!(matches!(
        client.lookup(&missing).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        client.lookup(&ListItem::new("No Ids", 2020)).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_radarr_add_sends_profile_and_reports_validation() {
    let server = MockServer::start().await;
    mount_radarr_handshake(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v3/movie"))
        .and(body_partial_json(json!({
            "title": "Dune",
            "tmdbId": 438631,
            "qualityProfileId": 4,
            "rootFolderPath": "/movies",
            "monitored": true,
            "minimumAvailability": "released",
            "addOptions": {"searchForMovie": true}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/movie"))
        .and(body_partial_json(json!({"title": "Heat"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([
            {"propertyName": "TmdbId", "errorMessage": "This movie has already been added"}
        ])))
        .mount(&server)
        .await;

    let client = RadarrClient::connect(reqwest::Client::new(), &radarr_config(&server.uri()))
        .await
        .unwrap();

    let dune = MovieCandidate {
        title: "Dune".to_string(),
        year: 2021,
        tmdb_id: 438631,
        ..Default::default()
    };
    client.add(&dune).await.unwrap();

    let heat = MovieCandidate {
        title: "Heat".to_string(),
        year: 1995,
        tmdb_id: 949,
        ..Default::default()
    };
    match client.add(&heat).await {
        Err(ClientError::Rejected(message)) => {
            assert_eq!(message, "This movie has already been added")
        }
        other => panic!("unexpected result {:?}", other),
    }
}

// ============================================================================
// OMDb
// ============================================================================

#[tokio::test]
async fn test_omdb_enrich_by_id_and_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("i", "tt2543164"))
        .and(query_param("apikey", "omdb-key"))
        .and(query_param("type", "movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Title": "Arrival",
            "Year": "2016",
            "Runtime": "116 min",
            "Genre": "Drama, Mystery, Sci-Fi",
            "Language": "English, Russian, Mandarin",
            "Ratings": [
                {"Source": "Internet Movie Database", "Value": "7.9/10"},
                {"Source": "Rotten Tomatoes", "Value": "94%"},
                {"Source": "Metacritic", "Value": "81/100"}
            ],
            "imdbVotes": "735,441",
            "imdbID": "tt2543164",
            "Response": "True"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("t", "Nonexistent Film"))
        .and(query_param("y", "2031"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "False",
            "Error": "Movie not found!"
        })))
        .mount(&server)
        .await;

    let client = OmdbClient::new(
        reqwest::Client::new(),
        &OmdbConfig {
            api_key: "omdb-key".to_string(),
            url: server.uri(),
        },
    )
    .unwrap();

    let enrichment = client
        .enrich(&ListItem::new("Arrival", 2016).with_imdb("tt2543164"))
        .await
        .unwrap();
    assert_eq!(enrichment.runtime, 116);
    assert_eq!(enrichment.imdb_votes, 735441);
    assert_eq!(enrichment.genre, vec!["Drama", "Mystery", "Sci-Fi"]);
    assert_eq!(enrichment.ratings.imdb, 7.9);
    assert_eq!(enrichment.ratings.metacritic, 81);
    assert_eq!(enrichment.ratings.rotten_tomatoes, 94);
    assert_eq!(enrichment.count_ratings, 3);

    match client.enrich(&ListItem::new("Nonexistent Film", 2031)).await {
        Err(ClientError::NotFound(message)) => assert_eq!(message, "Movie not found!"),
        other => panic!("unexpected result {:?}", other),
    }
}

// ============================================================================
// Trakt
// ============================================================================

fn trakt_movies(start: usize, count: usize) -> serde_json::Value {
    let movies: Vec<serde_json::Value> = (start..start + count)
        .map(|n| {
            json!({
                "title": format!("Movie {}", n),
                "year": 2000 + (n % 20),
                "ids": {"trakt": n, "slug": format!("movie-{}", n), "imdb": format!("tt{:07}", n), "tmdb": n}
            })
        })
        .collect();
    serde_json::Value::Array(movies)
}

#[tokio::test]
async fn test_trakt_pages_until_short_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movies/popular"))
        .and(header("trakt-api-key", "trakt-key"))
        .and(header("trakt-api-version", "2"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(trakt_movies(1, 100)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movies/popular"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(trakt_movies(101, 20)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movies/popular"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = TraktClient::new(
        reqwest::Client::new(),
        &TraktConfig {
            api_key: "trakt-key".to_string(),
            url: server.uri(),
        },
    )
    .unwrap();
    let source = TraktSource::new(Arc::new(client)).unwrap();

    let mut list = ListConfig::new("trakt://movies/popular", "trakt");
    list.filter.limit = Some(500);
    let items = source.fetch(&list).await.unwrap();

    assert_eq!(items.len(), 120);
    assert_eq!(items[0].title, "Movie 1");
    assert_eq!(items[0].imdb, "tt0000001");
    assert_eq!(items[119].tmdb, 120);
}

#[tokio::test]
async fn test_trakt_user_list_and_wrapped_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/cinephile/lists/best-of-2023/items/movies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"rank": 1, "type": "movie", "movie": {"title": "Past Lives", "year": 2023,
                "ids": {"trakt": 1, "imdb": "tt13238346", "tmdb": 666277}}},
            {"rank": 2, "type": "movie", "movie": {"title": "", "year": 2023, "ids": {}}}
        ])))
        .mount(&server)
        .await;

    let client = TraktClient::new(
        reqwest::Client::new(),
        &TraktConfig {
            api_key: "trakt-key".to_string(),
            url: server.uri(),
        },
    )
    .unwrap();
    let source = TraktSource::new(Arc::new(client)).unwrap();

    let list = ListConfig::new("https://trakt.tv/users/cinephile/lists/best-of-2023", "trakt");
    let items = source.fetch(&list).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Past Lives");
    assert_eq!(items[0].tmdb, 666277);
}

#[tokio::test]
async fn test_trakt_first_page_failure_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = TraktClient::new(
        reqwest::Client::new(),
        &TraktConfig {
            api_key: "wrong".to_string(),
            url: server.uri(),
        },
    )
    .unwrap();

    match client.fetch_list(&client.endpoint("movies/trending"), 10).await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status, 401),
        other => panic!("unexpected result {:?}", other.map(|m| m.len())),
    }
}

// ============================================================================
// RSS + GuessIt
// ============================================================================

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Releases</title>
    <item>
      <title><![CDATA[Arrival.2016.1080p.BluRay.x264-SPARKS]]></title>
    </item>
    <item>
      <title>Dark.S01E01.720p.WEB.x264</title>
    </item>
    <item>
      <title>Tom &amp; Jerry 2021 WEB</title>
    </item>
  </channel>
</rss>"#;

async fn mount_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_rss_with_guessing_keeps_movies() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    Mock::given(method("GET"))
        .and(path("/guess"))
        .and(query_param("filename", "Arrival.2016.1080p.BluRay.x264-SPARKS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Arrival", "year": 2016, "type": "movie"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guess"))
        .and(query_param("filename", "Dark.S01E01.720p.WEB.x264"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Dark", "season": 1, "episode": 1, "type": "episode"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guess"))
        .and(query_param("filename", "Tom & Jerry 2021 WEB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Tom & Jerry", "year": 2021, "type": "movie"
        })))
        .mount(&server)
        .await;

    let guessit = GuessItClient::new(
        reqwest::Client::new(),
        &GuessItConfig::webservice(format!("{}/guess", server.uri())),
    )
    .unwrap();
    let source = RssSource::new(reqwest::Client::new(), Some(Arc::new(guessit)));

    let mut list = ListConfig::new(format!("{}/feed.xml", server.uri()), "rss");
    list.use_guessing = true;
    let items = source.fetch(&list).await.unwrap();

    assert_eq!(
        items,
        vec![ListItem::new("Arrival", 2016), ListItem::new("Tom & Jerry", 2021)]
    );
}

#[tokio::test]
async fn test_rss_without_guessing_uses_raw_titles() {
    let server = MockServer::start().await;
    mount_feed(&server).await;

    let source = RssSource::new(reqwest::Client::new(), None);
    let mut list = ListConfig::new(format!("{}/feed.xml", server.uri()), "rss");
    list.filter.limit = Some(2);
    let items = source.fetch(&list).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Arrival.2016.1080p.BluRay.x264-SPARKS");
    assert_eq!(items[0].year, 0);
}

// ============================================================================
// Notification agents
// ============================================================================

#[tokio::test]
async fn test_dispatcher_delivers_to_webhooks_by_subscription() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gotify/message"))
        .and(body_json(json!({
            "title": "Reel: popular",
            "message": "Finish processing feed popular, added 2 movies"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    // Slack only subscribes to ADDED_MOVIE and must not be called
    Mock::given(method("POST"))
        .and(path("/slack"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let gotify = WebhookAgent::from_config(
        http.clone(),
        &WebhookConfig {
            webhook: format!("{}/gotify/message", server.uri()),
            events: vec![EventType::FinishFeed],
        },
    )
    .unwrap();
    let slack = WebhookAgent::from_config(
        http,
        &WebhookConfig {
            webhook: format!("{}/slack", server.uri()),
            events: vec![EventType::AddedMovie],
        },
    )
    .unwrap();

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(Arc::new(GotifyAgent::new(gotify)));
    dispatcher.register(Arc::new(SlackAgent::new(slack)));

    let delivered = dispatcher
        .publish(&ImportEvent::FinishFeed {
            run_id: Uuid::new_v4(),
            list: "popular".to_string(),
            approved: 3,
            added: 2,
            timestamp: chrono::Utc::now(),
        })
        .await;
    assert_eq!(delivered, 1);
}

#[tokio::test]
async fn test_webhook_failure_is_reported_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let webhook = WebhookAgent::new(reqwest::Client::new(), format!("{}/hook", server.uri()), vec![]);
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(Arc::new(SlackAgent::new(webhook)));

    let delivered = dispatcher
        .publish(&ImportEvent::FinishAllFeeds {
            run_id: Uuid::new_v4(),
            approved: 0,
            added: 0,
            timestamp: chrono::Utc::now(),
        })
        .await;
    assert_eq!(delivered, 0);
}
