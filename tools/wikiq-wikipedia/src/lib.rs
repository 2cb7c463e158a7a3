//! Wikipedia search tool.
//!
//! Searches English Wikipedia through the MediaWiki action API and returns
//! plain-text intro extracts of the top hits.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use wikiq_core::tool::{Tool, ToolError};
use wikiq_core::truncate;

/// Tool name as seen by the model.
pub const TOOL_NAME: &str = "search_wikipedia";

/// MediaWiki action API endpoint for English Wikipedia.
pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";

const USER_AGENT: &str = "WikipediaAgent/1.0";

/// Default timeout for HTTP requests (10 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 10;

const DEFAULT_NUM_RESULTS: u64 = 3;

/// Extracts longer than this are cut and suffixed with `...`.
const MAX_EXTRACT_CHARS: usize = 1000;

const NO_SUMMARY: &str = "No summary available.";
const RESULT_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
}

/// Wikipedia search tool.
///
/// Input: `{"query": string, "num_results"?: integer}` (default 3 results).
///
/// # Example
///
/// ```no_run
/// use wikiq_wikipedia::WikipediaSearch;
/// use wikiq_core::tool::Tool;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tool = WikipediaSearch::new();
/// let text = tool.execute(json!({"query": "Eiffel Tower"})).await?;
/// println!("{}", text);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct WikipediaSearch {
    client: Client,
    api_url: String,
    timeout: Duration,
}

impl Default for WikipediaSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl WikipediaSearch {
    /// Create the tool with default settings.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Use a different MediaWiki endpoint.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get_json<T>(&self, params: &[(&str, String)]) -> Result<T, ToolError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout(self.timeout.as_millis() as u64)
                } else if e.is_connect() {
                    ToolError::ExecutionFailed(format!("Failed to connect: {}", e))
                } else {
                    ToolError::ExecutionFailed(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Invalid API response: {}", e)))
    }

    async fn search_titles(&self, query: &str, limit: u64) -> Result<Vec<String>, ToolError> {
        let params = [
            ("action", "query".to_string()),
            ("list", "search".to_string()),
            ("srsearch", query.to_string()),
            ("srlimit", limit.to_string()),
            ("format", "json".to_string()),
            ("formatversion", "2".to_string()),
        ];
        let response: SearchResponse = self.get_json(&params).await?;
        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn fetch_extracts(&self, titles: &[String]) -> Result<Vec<Page>, ToolError> {
        let params = [
            ("action", "query".to_string()),
            ("titles", titles.join("|")),
            ("prop", "extracts".to_string()),
            ("exintro", "1".to_string()),
            ("explaintext", "1".to_string()),
            ("format", "json".to_string()),
            ("formatversion", "2".to_string()),
        ];
        let response: ExtractResponse = self.get_json(&params).await?;
        Ok(response.query.map(|q| q.pages).unwrap_or_default())
    }
}

/// Render fetched pages as model-facing text, skipping missing pages.
fn format_pages(query: &str, pages: Vec<Page>) -> String {
    let sections: Vec<String> = pages
        .into_iter()
        .filter(|page| !page.missing && !page.invalid)
        .map(|page| {
            let title = page.title.unwrap_or_else(|| "Unknown".to_string());
            let extract = match page.extract {
                Some(extract) => truncate(&extract, MAX_EXTRACT_CHARS),
                None => NO_SUMMARY.to_string(),
            };
            format!("## {}\n{}", title, extract)
        })
        .collect();

    if sections.is_empty() {
        no_results(query)
    } else {
        sections.join(RESULT_SEPARATOR)
    }
}

fn no_results(query: &str) -> String {
    format!("No Wikipedia articles found for: {}", query)
}

#[async_trait]
impl Tool for WikipediaSearch {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to look up on Wikipedia."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        let query = input
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidInput("Missing 'query' field".into()))?;

        let num_results = match input.get("num_results") {
            None | Some(Value::Null) => DEFAULT_NUM_RESULTS,
            Some(v) => v.as_u64().filter(|n| *n > 0).ok_or_else(|| {
                ToolError::InvalidInput(format!("'num_results' must be a positive integer, got {}", v))
            })?,
        };

        let titles = self.search_titles(query, num_results).await?;
        if titles.is_empty() {
            log::debug!("No search hits for '{}'", query);
            return Ok(no_results(query));
        }

        let pages = self.fetch_extracts(&titles).await?;
        Ok(format_pages(query, pages))
    }
}
