//! ScienceDirect search API client.
//!
//! Sends one GET per search to the Elsevier ScienceDirect search endpoint and
//! turns the `search-results` envelope into a [`SearchPage`].
//!
//! Upstream quirks handled here:
//! - `opensearch:totalResults` arrives as a string
//! - an empty result set is reported as a single entry carrying an `error` member
//! - `authors.author` may be a list, a single object or a bare string

use crate::config::FetcherConfig;
use crate::error::{FetcherError, OptionExt, Result};
use crate::models::{Access, Authors, Link, SearchEntry, SearchPage};
use crate::query::QueryForm;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

/// Search endpoint path, appended to the configured base URL
pub const SEARCH_PATH: &str = "/content/search/sciencedirect";

/// Anything that can answer a search for the form's current values
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, form: &QueryForm) -> Result<SearchPage>;
}

/// HTTP client for the ScienceDirect search API
pub struct ScienceDirectClient {
    client: Client,
    config: FetcherConfig,
}

impl ScienceDirectClient {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("sdfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetcherError::Config(format!("Failed to build HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            warn!("No API key configured; upstream will reject searches");
        }

        Ok(Self { client, config })
    }

    /// Build the request URL for the given form values.
    ///
    /// `start` carries the page number as entered, not a row offset.
    pub fn build_search_url(&self, form: &QueryForm) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.config.base_url, SEARCH_PATH))
            .map_err(|e| FetcherError::Config(format!("Invalid base URL: {}", e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", &form.query)
                .append_pair("date", &form.date_range())
                .append_pair("start", &form.page.to_string())
                .append_pair("count", &form.page_size.to_string());
            if let Some(key) = &self.config.api_key {
                pairs.append_pair("apiKey", key);
            }
            pairs.append_pair("httpAccept", "application/json");
        }

        Ok(url)
    }
}

#[async_trait]
impl SearchBackend for ScienceDirectClient {
    async fn search(&self, form: &QueryForm) -> Result<SearchPage> {
        let url = self.build_search_url(form)?;

        info!(
            query = %form.query,
            date = %form.date_range(),
            start = form.page,
            count = form.page_size.get(),
            "Searching ScienceDirect"
        );

        // reqwest errors echo the URL, which carries the credential
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetcherError::Network(e.without_url()))?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetcherError::Api {
                code: status.as_u16(),
                message: format!("ScienceDirect API error: {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetcherError::Network(e.without_url()))?;
        let page = parse_response(&body)?;

        info!(
            total = page.total,
            returned = page.entries.len(),
            "ScienceDirect search complete"
        );
        Ok(page)
    }
}

// === ScienceDirect API Response Types ===

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "dc:identifier", default)]
    identifier: Option<String>,
    #[serde(rename = "dc:title", default)]
    title: Option<String>,
    #[serde(default)]
    openaccess: Option<RawFlag>,
    #[serde(default)]
    link: Option<OneOrMany<RawLink>>,
    #[serde(default)]
    authors: Option<RawAuthors>,
    #[serde(rename = "prism:publicationName", default)]
    publication_name: Option<String>,
    #[serde(rename = "prism:volume", default)]
    volume: Option<String>,
    #[serde(rename = "prism:coverDate", default)]
    cover_date: Option<String>,
    #[serde(rename = "prism:startingPage", default)]
    starting_page: Option<String>,
    #[serde(rename = "prism:endingPage", default)]
    ending_page: Option<String>,
    #[serde(rename = "prism:doi", default)]
    doi: Option<String>,
    #[serde(rename = "prism:url", default)]
    api_url: Option<String>,
    #[serde(default)]
    pii: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    #[serde(rename = "@ref", default)]
    rel: String,
    #[serde(rename = "@href", default)]
    href: String,
}

#[derive(Debug, Deserialize)]
struct RawAuthors {
    #[serde(default)]
    author: Option<OneOrMany<RawAuthor>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAuthor {
    Name(String),
    Named {
        #[serde(rename = "$")]
        name: String,
    },
}

impl RawAuthor {
    fn into_name(self) -> String {
        match self {
            RawAuthor::Name(name) | RawAuthor::Named { name } => name.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl RawFlag {
    fn is_set(&self) -> bool {
        match self {
            RawFlag::Bool(b) => *b,
            RawFlag::Int(n) => *n != 0,
            RawFlag::Text(s) => matches!(s.trim(), "true" | "1"),
        }
    }
}

/// Parse a ScienceDirect search response body.
///
/// Fails with [`FetcherError::ResponseShape`] when the envelope, entry list or
/// total count is missing or malformed. Entries that cannot be identified are
/// skipped; the rest of the page is kept.
pub fn parse_response(body: &str) -> Result<SearchPage> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetcherError::ResponseShape(format!("body is not JSON: {}", e)))?;

    let envelope = value
        .get("search-results")
        .ok_or_shape("missing search-results envelope")?;

    let total = envelope
        .get("opensearch:totalResults")
        .ok_or_shape("missing opensearch:totalResults")
        .and_then(parse_total)?;

    let raw_entries = envelope
        .get("entry")
        .and_then(Value::as_array)
        .ok_or_shape("missing entry list")?;

    let mut entries = Vec::with_capacity(raw_entries.len());
    for raw in raw_entries {
        let raw: RawEntry = serde_json::from_value(raw.clone())
            .map_err(|e| FetcherError::ResponseShape(format!("malformed entry: {}", e)))?;

        if let Some(message) = &raw.error {
            debug!(message = %message, "Skipping error entry");
            continue;
        }
        match convert_entry(raw) {
            Some(entry) => entries.push(entry),
            None => warn!("Skipping entry without dc:identifier or pii"),
        }
    }

    Ok(SearchPage { total, entries })
}

/// Total count, sent as either a string or a number
fn parse_total(value: &Value) -> Result<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_shape("opensearch:totalResults is not a count")
}

/// `None` when the entry has neither an identifier nor a pii to key it by
fn convert_entry(raw: RawEntry) -> Option<SearchEntry> {
    let pii = raw.pii.unwrap_or_default();
    let doi = raw.doi.unwrap_or_default();

    let identifier = raw
        .identifier
        .filter(|id| !id.is_empty())
        .or_else(|| Some(pii.clone()).filter(|p| !p.is_empty()))?;

    let authors = raw
        .authors
        .and_then(|a| a.author)
        .map(|a| {
            Authors::from_names(a.into_vec().into_iter().map(RawAuthor::into_name).collect())
        })
        .unwrap_or(Authors::Absent);

    let links = raw
        .link
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .map(|l| Link {
            rel: l.rel,
            href: l.href,
        })
        .collect();

    Some(SearchEntry {
        identifier,
        access: Access::from_flag(raw.openaccess.is_some_and(|f| f.is_set())),
        title: raw.title.unwrap_or_default(),
        authors,
        publication_name: raw.publication_name.unwrap_or_default(),
        volume: raw.volume.filter(|v| !v.is_empty()),
        cover_date: raw.cover_date.unwrap_or_default(),
        starting_page: raw.starting_page.filter(|p| !p.is_empty()),
        ending_page: raw.ending_page.filter(|p| !p.is_empty()),
        doi,
        pii,
        api_url: raw.api_url,
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FormField, PageSize};
    use mockito::Matcher;

    const TWO_ENTRIES: &str = r#"{
        "search-results": {
            "opensearch:totalResults": "45",
            "opensearch:startIndex": "1",
            "entry": [
                {
                    "@_fa": "true",
                    "load-date": "2023-04-01T00:00:00.000Z",
                    "link": [
                        {"@_fa": "true", "@ref": "self", "@href": "https://api.elsevier.com/content/article/pii/S1"},
                        {"@_fa": "true", "@ref": "scidir", "@href": "https://www.sciencedirect.com/science/article/pii/S1"}
                    ],
                    "dc:identifier": "DOI:10.1016/j.one",
                    "prism:url": "https://api.elsevier.com/content/article/pii/S1",
                    "dc:title": "First <article>",
                    "dc:creator": "Ada Lovelace",
                    "prism:publicationName": "Journal of Engines",
                    "prism:volume": "7",
                    "prism:coverDate": "2023-05-01",
                    "prism:startingPage": "10",
                    "prism:endingPage": "19",
                    "prism:doi": "10.1016/j.one",
                    "openaccess": true,
                    "pii": "S1",
                    "authors": {"author": [{"$": "Ada Lovelace"}, {"$": "Charles Babbage"}, {"$": "Mary Somerville"}]}
                },
                {
                    "@_fa": "true",
                    "link": [],
                    "dc:identifier": "DOI:10.1016/j.two",
                    "dc:title": "Second",
                    "prism:publicationName": "Letters",
                    "prism:coverDate": "2022-01-01",
                    "prism:doi": "10.1016/j.two",
                    "openaccess": "false",
                    "pii": "S2",
                    "authors": {"author": "Grace Hopper"}
                }
            ]
        }
    }"#;

    fn form(query: &str) -> QueryForm {
        let mut form = QueryForm::default();
        form.update(FormField::Query(query.to_string()));
        form
    }

    fn client_for(base_url: &str, api_key: Option<&str>) -> ScienceDirectClient {
        let config = FetcherConfig {
            api_key: api_key.map(str::to_string),
            ..Default::default()
        }
        .with_base_url(base_url);
        ScienceDirectClient::new(config).expect("client")
    }

    #[test]
    fn test_build_search_url() {
        let client = client_for("https://api.elsevier.com", Some("k3y"));
        let mut form = form("machine learning");
        form.update(FormField::PageSize(PageSize::Fifty));
        form.update(FormField::Page(3));

        let url = client.build_search_url(&form).expect("url");
        let query = url.query().expect("query string");
        assert_eq!(url.path(), SEARCH_PATH);
        assert!(query.contains("query=machine+learning"));
        assert!(query.contains("date=2022-2024"));
        assert!(query.contains("start=3"));
        assert!(query.contains("count=50"));
        assert!(query.contains("apiKey=k3y"));
        assert!(query.contains("httpAccept=application%2Fjson"));
    }

    #[test]
    fn test_build_search_url_without_key() {
        let client = client_for("https://api.elsevier.com", None);
        let url = client.build_search_url(&form("x")).expect("url");
        assert!(!url.query().unwrap_or_default().contains("apiKey"));
    }

    #[test]
    fn test_parse_response() {
        let page = parse_response(TWO_ENTRIES).expect("parse");
        assert_eq!(page.total, 45);
        assert_eq!(page.entries.len(), 2);

        let first = &page.entries[0];
        assert_eq!(first.identifier, "DOI:10.1016/j.one");
        assert_eq!(first.access, Access::Open);
        assert_eq!(
            first.authors.names(),
            vec!["Ada Lovelace", "Charles Babbage", "Mary Somerville"]
        );
        assert_eq!(first.volume.as_deref(), Some("7"));
        assert_eq!(first.page_range().as_deref(), Some("10-19"));
        assert_eq!(
            first.title_link(),
            Some("https://www.sciencedirect.com/science/article/pii/S1")
        );

        let second = &page.entries[1];
        assert_eq!(second.access, Access::Closed);
        assert_eq!(second.authors, Authors::Single("Grace Hopper".to_string()));
        assert_eq!(second.volume, None);
        assert_eq!(second.title_link(), None);
    }

    #[test]
    fn test_parse_numeric_total_and_missing_authors() {
        let body = r#"{"search-results": {"opensearch:totalResults": 3, "entry": [
            {"dc:identifier": "X", "dc:title": "T", "authors": null},
            {"dc:identifier": "Y", "dc:title": "U"}
        ]}}"#;
        let page = parse_response(body).expect("parse");
        assert_eq!(page.total, 3);
        assert!(page.entries.iter().all(|e| e.authors == Authors::Absent));
    }

    #[test]
    fn test_parse_empty_result_marker() {
        let body = r#"{"search-results": {
            "opensearch:totalResults": "0",
            "entry": [{"@_fa": "true", "error": "Result set was empty"}]
        }}"#;
        let page = parse_response(body).expect("parse");
        assert_eq!(page.total, 0);
        assert!(page.entries.is_empty());
    }

    #[test]
    fn test_parse_shape_errors() {
        for body in [
            "not json",
            r#"{"service-error": {"status": {"statusCode": "AUTHENTICATION_ERROR"}}}"#,
            r#"{"search-results": {"entry": []}}"#,
            r#"{"search-results": {"opensearch:totalResults": "many", "entry": []}}"#,
            r#"{"search-results": {"opensearch:totalResults": "1", "entry": {"dc:identifier": "X"}}}"#,
        ] {
            assert!(
                matches!(parse_response(body), Err(FetcherError::ResponseShape(_))),
                "expected shape error for {}",
                body
            );
        }
    }

    #[test]
    fn test_parse_skips_entry_without_identifier() {
        let body = r#"{"search-results": {"opensearch:totalResults": "3", "entry": [
            {"dc:identifier": "A", "dc:title": "First"},
            {"dc:title": "no id", "pii": ""},
            {"pii": "S2", "dc:title": "Second"}
        ]}}"#;
        let page = parse_response(body).expect("parse");
        assert_eq!(page.total, 3);
        let ids: Vec<&str> = page.entries.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(ids, vec!["A", "S2"]);
    }

    #[tokio::test]
    async fn test_search_sends_single_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", SEARCH_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "graphene oxide".into()),
                Matcher::UrlEncoded("date".into(), "2022-2024".into()),
                Matcher::UrlEncoded("start".into(), "1".into()),
                Matcher::UrlEncoded("count".into(), "20".into()),
                Matcher::UrlEncoded("apiKey".into(), "secret".into()),
                Matcher::UrlEncoded("httpAccept".into(), "application/json".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(TWO_ENTRIES)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url(), Some("secret"));
        let page = client.search(&form("graphene oxide")).await.expect("search");

        assert_eq!(page.total, 45);
        assert_eq!(page.entries.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", SEARCH_PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"service-error": {}}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let result = client.search(&form("graphene")).await;
        assert!(matches!(result, Err(FetcherError::Api { code: 401, .. })));
    }

    #[tokio::test]
    async fn test_network_error_hides_api_key() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = client_for(&format!("http://{}", addr), Some("secret"));
        let err = client
            .search(&form("graphene"))
            .await
            .expect_err("connection should be refused");

        assert!(matches!(err, FetcherError::Network(_)));
        assert!(!err.to_string().contains("secret"));
        assert!(!format!("{:?}", err).contains("secret"));
    }
}
