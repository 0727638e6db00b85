//! Dashboard backend endpoints
//!
//! Thin typed wrappers over [`AuthenticatedHttpClient`]. Every call checks
//! for a token first and fails with [`Error::NoCredential`] instead of
//! sending a request that is bound to be rejected.
//!
//! The backend dispatches on an `action` field:
//!
//! ```text
//! POST /lists/    {"action": "createList", "data": "<ListObject JSON>"}
//! POST /lists/    {"action": "getList", "params": {...}}
//! POST /streaks/  {"action": "getStreaks" | "updateStreak", "params": {}}
//! ```

use crate::error::{Error, Result};
use crate::http::{AuthenticatedHttpClient, OutboundRequest};
use crate::types::{StringMap, Token};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

const LISTS_PATH: &str = "/lists/";
const STREAKS_PATH: &str = "/streaks/";

// ============================================================================
// Payload types
// ============================================================================

/// All lists shown on one page for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListObject {
    /// Logical owner of the lists (e.g. "dashboard")
    pub parent_page: String,
    /// Day the lists belong to, `YYYY-MM-DD`
    pub date: String,
    /// Lists in display order
    #[serde(default)]
    pub lists: Vec<TaskList>,
}

/// A titled list of tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub title: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub items: Vec<TaskItem>,
}

fn default_true() -> bool {
    true
}

/// How often a recurring task repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// One task in a list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub text_string: String,
    /// `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    /// `h:mmam` / `h:mmpm`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_end_time: Option<String>,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_time_estimate: Option<u32>,
    #[serde(default)]
    pub recurring_task: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_frequency: Option<RecurringFrequency>,
    #[serde(default)]
    pub due_date_checkbox: bool,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub complete: bool,
}

/// Which list object to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListQuery {
    /// Legacy lookup by list title
    Title(String),
    /// Lists of one page on one day
    Filter { parent_page: String, date: String },
}

impl ListQuery {
    /// `params` object sent to the backend
    pub fn to_params(&self) -> Value {
        match self {
            ListQuery::Title(title) => json!({ "list_title": title }),
            ListQuery::Filter { parent_page, date } => json!({
                "parent_page": parent_page,
                "date": date,
            }),
        }
    }
}

impl From<&str> for ListQuery {
    fn from(title: &str) -> Self {
        ListQuery::Title(title.to_string())
    }
}

// ============================================================================
// Client
// ============================================================================

/// Dashboard API client
#[derive(Debug, Clone)]
pub struct DashboardApi {
    client: AuthenticatedHttpClient,
}

impl DashboardApi {
    /// Wrap an authenticated client
    pub fn new(client: AuthenticatedHttpClient) -> Self {
        Self { client }
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &AuthenticatedHttpClient {
        &self.client
    }

    /// Current token, or [`Error::NoCredential`] if there is none
    pub fn validate_token(&self) -> Result<Token> {
        self.client
            .token_store()
            .get_token()
            .ok_or(Error::NoCredential)
    }

    /// Create or replace the list object for a page and day
    pub async fn create_list(&self, list: &ListObject) -> Result<Value> {
        let data = serde_json::to_string(list)?;
        self.call(
            "creating list",
            OutboundRequest::post(LISTS_PATH).json(json!({
                "action": "createList",
                "data": data,
            })),
        )
        .await
    }

    /// Fetch a list object
    pub async fn get_list(&self, query: impl Into<ListQuery>) -> Result<Value> {
        let query = query.into();
        self.call(
            "fetching list",
            OutboundRequest::post(LISTS_PATH).json(json!({
                "action": "getList",
                "params": query.to_params(),
            })),
        )
        .await
    }

    /// Generic GET with query parameters
    pub async fn get(&self, path: &str, params: &StringMap) -> Result<Value> {
        let mut request = OutboundRequest::get(path);
        request.query.clone_from(params);
        self.call("GET request", request).await
    }

    /// Generic action POST; `data` is sent as a JSON string
    pub async fn post_action(&self, path: &str, action: &str, data: &Value) -> Result<Value> {
        let data = serde_json::to_string(data)?;
        self.call(
            "POST request",
            OutboundRequest::post(path).json(json!({
                "action": action,
                "data": data,
            })),
        )
        .await
    }

    /// Fetch the user's streaks
    pub async fn get_streaks(&self) -> Result<Value> {
        self.streak_action("getStreaks").await
    }

    /// Record today's activity for the user's streaks
    pub async fn update_streak(&self) -> Result<Value> {
        self.streak_action("updateStreak").await
    }

    async fn streak_action(&self, action: &str) -> Result<Value> {
        self.call(
            action,
            OutboundRequest::post(STREAKS_PATH).json(json!({
                "action": action,
                "params": {},
            })),
        )
        .await
    }

    async fn call(&self, what: &str, request: OutboundRequest) -> Result<Value> {
        self.validate_token()?;

        let path = request.path.clone();
        self.client
            .request_json(request)
            .await
            .inspect_err(|e| warn!("Error {what} ({path}): {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::config::ClientConfig;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer, token: Option<&str>) -> DashboardApi {
        let store = match token.and_then(Token::new) {
            Some(token) => MemoryTokenStore::with_token(token),
            None => MemoryTokenStore::new(),
        };
        let config = ClientConfig::builder().base_url(server.uri()).build();
        DashboardApi::new(AuthenticatedHttpClient::new(config, Arc::new(store)).unwrap())
    }

    fn sample_list() -> ListObject {
        ListObject {
            parent_page: "dashboard".to_string(),
            date: "2024-03-01".to_string(),
            lists: vec![TaskList {
                title: "Today".to_string(),
                visible: true,
                color: "#ffcc00".to_string(),
                items: vec![TaskItem {
                    text_string: "Buy milk".to_string(),
                    scheduled_date: Some("2024-03-01".to_string()),
                    task_time_estimate: Some(15),
                    recurring_task: true,
                    recurring_frequency: Some(RecurringFrequency::Weekly),
                    ..TaskItem::default()
                }],
            }],
        }
    }

    #[tokio::test]
    async fn test_missing_token_fails_fast() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = api_for(&server, None);
        assert!(matches!(api.get_streaks().await, Err(Error::NoCredential)));
        assert!(matches!(
            api.get_list("groceries").await,
            Err(Error::NoCredential)
        ));
        assert!(matches!(
            api.create_list(&sample_list()).await,
            Err(Error::NoCredential)
        ));
    }

    #[tokio::test]
    async fn test_create_list_sends_stringified_data() {
        let server = MockServer::start().await;
        let list = sample_list();
        let expected = json!({
            "action": "createList",
            "data": serde_json::to_string(&list).unwrap(),
        });

        Mock::given(method("POST"))
            .and(path("/lists/"))
            .and(header("authorization", "T1"))
            .and(body_json(&expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Success"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, Some("T1"));
        let body = api.create_list(&list).await.unwrap();
        assert_eq!(body["message"], "Success");
    }

    #[tokio::test]
    async fn test_get_list_by_title() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/lists/"))
            .and(body_json(json!({
                "action": "getList",
                "params": {"list_title": "groceries"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["milk"])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, Some("T1"));
        let body = api.get_list("groceries").await.unwrap();
        assert_eq!(body, json!(["milk"]));
    }

    #[tokio::test]
    async fn test_get_list_by_filter() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/lists/"))
            .and(body_json(json!({
                "action": "getList",
                "params": {"parent_page": "dashboard", "date": "2024-03-01"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Success",
                "data": {"parent_page": "dashboard", "date": "2024-03-01", "lists": []},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, Some("T1"));
        let body = api
            .get_list(ListQuery::Filter {
                parent_page: "dashboard".to_string(),
                date: "2024-03-01".to_string(),
            })
            .await
            .unwrap();

        let list: ListObject = serde_json::from_value(body["data"].clone()).unwrap();
        assert_eq!(list.parent_page, "dashboard");
        assert!(list.lists.is_empty());
    }

    #[tokio::test]
    async fn test_streak_actions() {
        let server = MockServer::start().await;

        for action in ["getStreaks", "updateStreak"] {
            Mock::given(method("POST"))
                .and(path("/streaks/"))
                .and(body_json(json!({"action": action, "params": {}})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"action": action})))
                .expect(1)
                .mount(&server)
                .await;
        }

        let api = api_for(&server, Some("T1"));
        assert_eq!(api.get_streaks().await.unwrap()["action"], "getStreaks");
        assert_eq!(api.update_streak().await.unwrap()["action"], "updateStreak");
    }

    #[tokio::test]
    async fn test_generic_get_and_post() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/stats"))
            .and(query_param("range", "week"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 3})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/notes/"))
            .and(body_json(json!({"action": "addNote", "data": "{\"text\":\"hi\"}"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, Some("T1"));
        let params = StringMap::from([("range".to_string(), "week".to_string())]);
        assert_eq!(api.get("/stats", &params).await.unwrap()["count"], 3);
        assert_eq!(
            api.post_action("/notes/", "addNote", &json!({"text": "hi"}))
                .await
                .unwrap()["ok"],
            true
        );
    }

    #[tokio::test]
    async fn test_errors_are_propagated() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/streaks/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server, Some("T1"));
        let err = api.get_streaks().await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn test_task_item_wire_names() {
        let item = TaskItem {
            text_string: "Run".to_string(),
            scheduled_start_time: Some("7:00am".to_string()),
            due_date_checkbox: true,
            ..TaskItem::default()
        };
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["textString"], "Run");
        assert_eq!(value["scheduledStartTime"], "7:00am");
        assert_eq!(value["dueDateCheckbox"], true);
        assert_eq!(value["dueDate"], Value::Null);
        assert!(value.get("scheduledDate").is_none());
    }

    #[test]
    fn test_list_query_params() {
        assert_eq!(
            ListQuery::from("groceries").to_params(),
            json!({"list_title": "groceries"})
        );
    }
}
