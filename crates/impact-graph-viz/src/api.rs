//! HTTP API client for the impact-analysis backend.
//!
//! Uses gloo-net for HTTP requests in the WASM environment and the shared
//! single-value result slot pattern for delivering async completions back
//! into the frame loop. Native builds get stub triggers so the crate still
//! compiles and tests run without a browser.
//!
//! Concurrent fetches are neither deduplicated nor cancelled: every
//! completion overwrites the slot, so the displayed graph is whichever
//! response settled last. A completion landing after its owning view was
//! discarded writes into a slot nobody polls — a guarded no-op.

// Serde types are deserialized from JSON, not constructed by Rust code, and
// the native stubs exist only for compilation compatibility.
#![allow(dead_code)]

use impact_graph_core::GraphSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Shared single-value channel for async operation results.
pub type SharedSlot<T> = Rc<RefCell<Option<T>>>;

fn new_slot<T>() -> SharedSlot<T> {
    Rc::new(RefCell::new(None))
}

/// Errors surfaced by any API call. Transport failures and unsuccessful
/// service responses both land here; the panels render them inline.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The call itself could not complete.
    #[error("Network error: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text, best effort.
        body: String,
    },
    /// The response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Decode(String),
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Request body for repository ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestRequest {
    /// Normalized repository URL.
    pub repo_url: String,
    /// Optional pass-through GitHub token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

/// Response from repository ingestion.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestResponse {
    /// Server-side path of the cloned repository; threaded into the graph views.
    pub repo_path: String,
}

/// Request body for diff analysis.
#[derive(Debug, Clone, Serialize)]
pub struct DiffRequest {
    /// Unified diff patch text.
    pub diff_patch: String,
}

/// Request body for the question-answering endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    /// Free-form question.
    pub question: String,
    /// Optional chunk ids to scope the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_ids: Option<Vec<String>>,
    /// Optional repository path to scope the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct RepoPathRequest {
    repo_path: String,
}

/// Response from the node-list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeListResponse {
    /// Available node ids, in service order.
    #[serde(default)]
    pub nodes: Vec<String>,
}

// =============================================================================
// Repository URL Normalization
// =============================================================================

/// Normalize user input into a full GitHub URL before ingestion.
///
/// The leading `@` is stripped before any other rewrite rule applies;
/// `github.com/...` gains the scheme; bare `owner/repo` gains the full
/// prefix; anything already carrying a scheme passes through unchanged.
pub fn normalize_repo_url(input: &str) -> String {
    let mut url = input.trim().to_string();

    if let Some(stripped) = url.strip_prefix('@') {
        url = stripped.to_string();
    }

    if !url.starts_with("https://github.com/") {
        if url.starts_with("github.com/") {
            url = format!("https://{}", url);
        } else if url.contains('/') && !url.starts_with("http") {
            url = format!("https://github.com/{}", url);
        }
    }

    url
}

// =============================================================================
// Graph Queries
// =============================================================================

/// The query a graph view is currently displaying; re-issued by refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphQuery {
    /// Neighborhood graph centered on one node id.
    Neighborhood(String),
    /// Whole-repository structural graph for a repo path.
    RepoTree(String),
}

/// Completion value delivered by a graph fetch.
pub type GraphFetchResult = Result<(GraphQuery, GraphSnapshot), FetchError>;

/// Fetch adapter for one graph view.
///
/// Owns the shared result slot and the current query. No retry, no caching,
/// no dedup: firing a second request while the first is in flight simply
/// means both completions race for the slot.
pub struct GraphClient {
    slot: SharedSlot<GraphFetchResult>,
    query: Option<GraphQuery>,
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphClient {
    /// Create a client with an empty slot and no query.
    pub fn new() -> Self {
        Self {
            slot: new_slot(),
            query: None,
        }
    }

    /// The query this view currently displays, if any.
    pub fn query(&self) -> Option<&GraphQuery> {
        self.query.as_ref()
    }

    /// Request the neighborhood graph for one node id.
    pub fn load_neighborhood(&mut self, node_id: &str) {
        let query = GraphQuery::Neighborhood(node_id.to_string());
        self.query = Some(query.clone());
        self.dispatch(query);
    }

    /// Request the whole-repository structural graph.
    pub fn load_repo_tree(&mut self, repo_path: &str) {
        let query = GraphQuery::RepoTree(repo_path.to_string());
        self.query = Some(query.clone());
        self.dispatch(query);
    }

    /// Re-issue the fetch for the current query; no-op without one.
    pub fn refresh(&mut self) {
        if let Some(query) = self.query.clone() {
            self.dispatch(query);
        }
    }

    /// Write a completion into the shared slot, overwriting any earlier
    /// unpolled result. This is the settle path used by the spawned fetch
    /// tasks; tests call it directly to control settle order.
    pub fn settle(&self, result: GraphFetchResult) {
        *self.slot.borrow_mut() = Some(result);
    }

    /// Take the most recently settled completion, if any.
    ///
    /// Called once per frame. With overlapping fetches the last-settled
    /// result wins; earlier ones were already overwritten in the slot.
    pub fn poll(&mut self) -> Option<GraphFetchResult> {
        let result = self.slot.borrow_mut().take();
        if let Some(Err(err)) = &result {
            tracing::warn!(error = %err, "graph fetch failed");
        }
        result
    }

    #[cfg(target_arch = "wasm32")]
    fn dispatch(&self, query: GraphQuery) {
        let slot = self.slot.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = match &query {
                GraphQuery::Neighborhood(node_id) => wasm_impl::fetch_neighborhood(node_id).await,
                GraphQuery::RepoTree(repo_path) => wasm_impl::fetch_repo_tree(repo_path).await,
            };
            *slot.borrow_mut() = Some(result.map(|snapshot| (query, snapshot)));
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn dispatch(&self, _query: GraphQuery) {
        self.settle(Err(FetchError::Transport(
            "graph fetch not available in native build".to_string(),
        )));
    }
}

// =============================================================================
// One-Shot Task Slots (forms and node list)
// =============================================================================

/// Shared result slot for a single async operation.
pub struct TaskSlot<T> {
    slot: SharedSlot<Result<T, FetchError>>,
}

impl<T> Default for TaskSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskSlot<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self { slot: new_slot() }
    }

    /// Write a completion, overwriting any earlier unpolled result.
    pub fn settle(&self, result: Result<T, FetchError>) {
        *self.slot.borrow_mut() = Some(result);
    }

    /// Take the most recently settled completion, if any.
    pub fn poll(&mut self) -> Option<Result<T, FetchError>> {
        self.slot.borrow_mut().take()
    }

    fn handle(&self) -> SharedSlot<Result<T, FetchError>> {
        self.slot.clone()
    }
}

/// Trigger repository ingestion; the completion lands in `task`.
#[cfg(target_arch = "wasm32")]
pub fn spawn_ingest(task: &TaskSlot<IngestResponse>, request: IngestRequest) {
    let slot = task.handle();
    wasm_bindgen_futures::spawn_local(async move {
        *slot.borrow_mut() = Some(wasm_impl::ingest_repo(&request).await);
    });
}

/// Trigger repository ingestion (native stub).
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_ingest(task: &TaskSlot<IngestResponse>, _request: IngestRequest) {
    task.settle(Err(FetchError::Transport(
        "ingest not available in native build".to_string(),
    )));
}

/// Trigger diff analysis; the completion lands in `task`.
#[cfg(target_arch = "wasm32")]
pub fn spawn_analyze_diff(task: &TaskSlot<Value>, request: DiffRequest) {
    let slot = task.handle();
    wasm_bindgen_futures::spawn_local(async move {
        *slot.borrow_mut() = Some(wasm_impl::analyze_diff(&request).await);
    });
}

/// Trigger diff analysis (native stub).
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_analyze_diff(task: &TaskSlot<Value>, _request: DiffRequest) {
    task.settle(Err(FetchError::Transport(
        "diff analysis not available in native build".to_string(),
    )));
}

/// Trigger the question-answering call; the completion lands in `task`.
#[cfg(target_arch = "wasm32")]
pub fn spawn_ask(task: &TaskSlot<Value>, request: AskRequest) {
    let slot = task.handle();
    wasm_bindgen_futures::spawn_local(async move {
        *slot.borrow_mut() = Some(wasm_impl::ask_question(&request).await);
    });
}

/// Trigger the question-answering call (native stub).
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_ask(task: &TaskSlot<Value>, _request: AskRequest) {
    task.settle(Err(FetchError::Transport(
        "ask not available in native build".to_string(),
    )));
}

/// Trigger the node-list fetch; the completion lands in `task`.
#[cfg(target_arch = "wasm32")]
pub fn spawn_node_list(task: &TaskSlot<Vec<String>>, repo_path: String) {
    let slot = task.handle();
    wasm_bindgen_futures::spawn_local(async move {
        *slot.borrow_mut() = Some(wasm_impl::fetch_node_list(&repo_path).await);
    });
}

/// Trigger the node-list fetch (native stub).
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_node_list(task: &TaskSlot<Vec<String>>, _repo_path: String) {
    task.settle(Err(FetchError::Transport(
        "node list not available in native build".to_string(),
    )));
}

// =============================================================================
// WASM API Functions
// =============================================================================

#[cfg(target_arch = "wasm32")]
mod wasm_impl {
    use super::*;
    use gloo_net::http::{Request, Response};
    use impact_graph_core::RawGraphResponse;

    async fn check_status(resp: Response) -> Result<Response, FetchError> {
        if resp.ok() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(FetchError::Status { status, body })
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, FetchError> {
        resp.json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        url: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        let resp = Request::post(url)
            .json(body)
            .map_err(|e| FetchError::Transport(e.to_string()))?
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        decode(check_status(resp).await?).await
    }

    /// Fetch the neighborhood graph for one node id.
    pub async fn fetch_neighborhood(node_id: &str) -> Result<GraphSnapshot, FetchError> {
        let url = format!("/api/graph/{}", urlencoding(node_id));
        let resp = Request::get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let raw: RawGraphResponse = decode(check_status(resp).await?).await?;
        Ok(GraphSnapshot::from_raw(raw))
    }

    /// Fetch the whole-repository structural graph.
    pub async fn fetch_repo_tree(repo_path: &str) -> Result<GraphSnapshot, FetchError> {
        let raw: RawGraphResponse = post_json(
            "/api/graph/repo_tree",
            &RepoPathRequest {
                repo_path: repo_path.to_string(),
            },
        )
        .await?;
        Ok(GraphSnapshot::from_raw(raw))
    }

    /// Fetch the list of available node ids for a repository.
    pub async fn fetch_node_list(repo_path: &str) -> Result<Vec<String>, FetchError> {
        let resp: NodeListResponse = post_json(
            "/api/graph/list_nodes",
            &RepoPathRequest {
                repo_path: repo_path.to_string(),
            },
        )
        .await?;
        Ok(resp.nodes)
    }

    /// Ingest a repository by URL.
    pub async fn ingest_repo(request: &IngestRequest) -> Result<IngestResponse, FetchError> {
        post_json("/api/ingest_repo", request).await
    }

    /// Analyze a diff patch; the report shape is service-defined.
    pub async fn analyze_diff(request: &DiffRequest) -> Result<Value, FetchError> {
        post_json("/api/analyze", request).await
    }

    /// Ask a question; the answer shape is service-defined.
    pub async fn ask_question(request: &AskRequest) -> Result<Value, FetchError> {
        post_json("/api/ask", request).await
    }

    /// Simple URL encoding for path parameters.
    fn urlencoding(s: &str) -> String {
        s.chars()
            .map(|c| match c {
                ' ' => "%20".to_string(),
                '/' => "%2F".to_string(),
                '\\' => "%5C".to_string(),
                ':' => "%3A".to_string(),
                '?' => "%3F".to_string(),
                '#' => "%23".to_string(),
                _ => c.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use impact_graph_core::{GraphSnapshot, RawGraphResponse};
    use serde_json::json;

    fn sample_snapshot(ids: &[&str]) -> GraphSnapshot {
        let raw: RawGraphResponse = serde_json::from_value(json!({
            "nodes": ids,
            "edges": []
        }))
        .expect("valid raw json");
        GraphSnapshot::from_raw(raw)
    }

    #[test]
    fn test_normalize_bare_owner_repo() {
        assert_eq!(
            normalize_repo_url("owner/repo"),
            "https://github.com/owner/repo"
        );
    }

    #[test]
    fn test_normalize_full_url_passes_through() {
        assert_eq!(
            normalize_repo_url("https://github.com/owner/repo"),
            "https://github.com/owner/repo"
        );
    }

    #[test]
    fn test_normalize_strips_at_prefix_first() {
        assert_eq!(
            normalize_repo_url("@owner/repo"),
            "https://github.com/owner/repo"
        );
        assert_eq!(
            normalize_repo_url("@https://github.com/owner/repo"),
            "https://github.com/owner/repo"
        );
    }

    #[test]
    fn test_normalize_adds_scheme_to_bare_host() {
        assert_eq!(
            normalize_repo_url("github.com/owner/repo"),
            "https://github.com/owner/repo"
        );
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(
            normalize_repo_url("  owner/repo  "),
            "https://github.com/owner/repo"
        );
    }

    #[test]
    fn test_last_settled_wins_across_overlapping_fetches() {
        let mut client = GraphClient::new();

        // Request A, then quickly request B. The native dispatch stub settles
        // an error each time; the simulated completions below overwrite it,
        // exactly as late responses overwrite the slot in the browser.
        client.load_neighborhood("a");
        client.load_neighborhood("b");

        // B's response resolves first...
        client.settle(Ok((
            GraphQuery::Neighborhood("b".into()),
            sample_snapshot(&["b", "b1"]),
        )));
        let (query, snapshot) = client.poll().expect("b settled").expect("b ok");
        assert_eq!(query, GraphQuery::Neighborhood("b".into()));
        assert_eq!(snapshot.node_count(), 2);

        // ...and A's resolves second: the displayed graph ends up being A's.
        client.settle(Ok((
            GraphQuery::Neighborhood("a".into()),
            sample_snapshot(&["a"]),
        )));
        let (query, snapshot) = client.poll().expect("a settled").expect("a ok");
        assert_eq!(query, GraphQuery::Neighborhood("a".into()));
        assert_eq!(snapshot.node_count(), 1);

        // Nothing further settles.
        assert!(client.poll().is_none());
    }

    #[test]
    fn test_unpolled_results_are_overwritten_in_the_slot() {
        let mut client = GraphClient::new();
        client.load_neighborhood("a");

        client.settle(Ok((
            GraphQuery::Neighborhood("b".into()),
            sample_snapshot(&["b"]),
        )));
        client.settle(Ok((
            GraphQuery::Neighborhood("a".into()),
            sample_snapshot(&["a"]),
        )));

        // Only the last-settled completion is observable.
        let (query, _) = client.poll().expect("settled").expect("ok");
        assert_eq!(query, GraphQuery::Neighborhood("a".into()));
        assert!(client.poll().is_none());
    }

    #[test]
    fn test_refresh_reissues_current_query() {
        let mut client = GraphClient::new();
        client.load_neighborhood("main.py");
        let _ = client.poll();

        client.refresh();
        assert_eq!(
            client.query(),
            Some(&GraphQuery::Neighborhood("main.py".into()))
        );
        // The native stub settles an error; refresh still dispatched.
        assert!(matches!(client.poll(), Some(Err(_))));
    }

    #[test]
    fn test_refresh_without_query_is_a_noop() {
        let mut client = GraphClient::new();
        client.refresh();
        assert!(client.poll().is_none());
        assert!(client.query().is_none());
    }

    #[test]
    fn test_task_slot_takes_once() {
        let mut task: TaskSlot<Vec<String>> = TaskSlot::new();
        task.settle(Ok(vec!["main.py".into()]));
        assert!(task.poll().is_some());
        assert!(task.poll().is_none());
    }
}
