//! Notion REST API client for the task database.

pub mod page;

use async_trait::async_trait;
use notion_gcal_core::error::{SyncError, SyncResult};
use notion_gcal_core::provider::{RecordPage, TaskStore};
use notion_gcal_core::task::TaskRecord;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use page::{linked_event_id_update, NotionPage, QueryResponse};

const NOTION_API_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

pub struct NotionClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(token: &str) -> Self {
        NotionClient {
            http: reqwest::Client::new(),
            token: token.to_string(),
            base_url: NOTION_API_URL.to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> SyncResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Http(format!("{}: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, what, &body));
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Provider(format!("{}: unexpected response: {}", what, e)))
    }
}

fn status_error(status: StatusCode, what: &str, body: &str) -> SyncError {
    let message = format!("{} failed with {}: {}", what, status, body);
    if status == StatusCode::NOT_FOUND {
        SyncError::NotFound(message)
    } else {
        SyncError::Http(message)
    }
}

#[async_trait]
impl TaskStore for NotionClient {
    async fn query(&self, database_id: &str, cursor: Option<&str>) -> SyncResult<RecordPage> {
        let mut body = json!({ "page_size": PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }

        let request = self
            .request(Method::POST, &format!("databases/{}/query", database_id))
            .json(&body);
        let response: QueryResponse = self.send(request, "Notion database query").await?;

        Ok(RecordPage {
            records: response
                .results
                .into_iter()
                .map(NotionPage::into_task_record)
                .collect(),
            has_more: response.has_more,
            next_cursor: response.next_cursor,
        })
    }

    async fn read_record(&self, record_id: &str) -> SyncResult<TaskRecord> {
        let request = self.request(Method::GET, &format!("pages/{}", record_id));
        let page: NotionPage = self.send(request, "Notion page read").await?;
        Ok(page.into_task_record())
    }

    async fn write_linked_event_id(&self, record_id: &str, event_id: &str) -> SyncResult<()> {
        let request = self
            .request(Method::PATCH, &format!("pages/{}", record_id))
            .json(&linked_event_id_update(event_id));
        let _: serde_json::Value = self.send(request, "Notion page update").await?;
        Ok(())
    }
}
