use crate::models::{Note, NotePayload};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
    /// 2xx response carrying `success: false`.
    Rejected,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    pub(crate) fn rejected(ctx: &str, reason: Option<&str>) -> Self {
        Self {
            kind: ApiErrorKind::Rejected,
            message: match reason {
                Some(r) if !r.trim().is_empty() => format!("{ctx}: {r}"),
                _ => format!("{ctx}: server reported failure"),
            },
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ShareRequest {
    pub permission: String,
    pub expiry_days: u32,
}

#[derive(Deserialize, Debug)]
struct NoteListResponse {
    success: bool,
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default, alias = "message")]
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct NoteResponse {
    success: bool,
    #[serde(default)]
    note: Option<Note>,
    #[serde(default, alias = "message")]
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ShareResponse {
    success: bool,
    #[serde(default)]
    share_url: Option<String>,
    #[serde(default, alias = "message")]
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct AckResponse {
    success: bool,
    #[serde(default, alias = "message")]
    error: Option<String>,
}

/// Persistence collaborator consumed by the editor engine.
#[async_trait]
pub trait NotesApi: Send + Sync {
    async fn list_notes(&self) -> ApiResult<Vec<Note>>;
    async fn get_note(&self, id: &str) -> ApiResult<Note>;
    async fn create_note(&self, payload: &NotePayload) -> ApiResult<Note>;
    async fn update_note(&self, id: &str, payload: &NotePayload) -> ApiResult<Note>;
    async fn delete_note(&self, id: &str) -> ApiResult<()>;
    /// Returns the issued share URL.
    async fn share_note(&self, id: &str, req: &ShareRequest) -> ApiResult<String>;
    async fn unshare_note(&self, id: &str) -> ApiResult<()>;
}

#[derive(Clone)]
pub struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(crate::config::EnvConfig::new().api_url)
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub(crate) fn get_auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub(crate) fn note_path(id: &str) -> String {
        format!("/notes/{}", urlencoding::encode(id))
    }

    fn with_auth_headers(
        mut req: reqwest::RequestBuilder,
        header: Option<String>,
    ) -> reqwest::RequestBuilder {
        if let Some(header) = header {
            req = req.header("Authorization", header);
        }
        req
    }

    async fn request_api<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&impl Serialize>,
    ) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "notes api request");

        let mut req = self.http.request(method, url);
        req = Self::with_auth_headers(req, self.get_auth_header());

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            res.json().await.map_err(ApiError::parse)
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, "Request failed"))
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

fn unwrap_note(resp: NoteResponse, ctx: &str) -> ApiResult<Note> {
    if !resp.success {
        return Err(ApiError::rejected(ctx, resp.error.as_deref()));
    }
    resp.note
        .ok_or_else(|| ApiError::parse(format!("{ctx}: response is missing note")))
}

fn check_ack(resp: AckResponse, ctx: &str) -> ApiResult<()> {
    if resp.success {
        Ok(())
    } else {
        Err(ApiError::rejected(ctx, resp.error.as_deref()))
    }
}

// Bodiless requests still go through `request_api`; `None::<&()>` keeps the type concrete.
const NO_BODY: Option<&()> = None;

#[async_trait]
impl NotesApi for ApiClient {
    async fn list_notes(&self) -> ApiResult<Vec<Note>> {
        let resp: NoteListResponse = self
            .request_api(reqwest::Method::GET, "/notes", NO_BODY)
            .await?;
        if !resp.success {
            return Err(ApiError::rejected("List notes", resp.error.as_deref()));
        }
        Ok(resp.notes)
    }

    async fn get_note(&self, id: &str) -> ApiResult<Note> {
        let resp: NoteResponse = self
            .request_api(reqwest::Method::GET, &Self::note_path(id), NO_BODY)
            .await?;
        unwrap_note(resp, "Get note")
    }

    async fn create_note(&self, payload: &NotePayload) -> ApiResult<Note> {
        let resp: NoteResponse = self
            .request_api(reqwest::Method::POST, "/notes", Some(payload))
            .await?;
        unwrap_note(resp, "Create note")
    }

    async fn update_note(&self, id: &str, payload: &NotePayload) -> ApiResult<Note> {
        let resp: NoteResponse = self
            .request_api(reqwest::Method::PUT, &Self::note_path(id), Some(payload))
            .await?;
        unwrap_note(resp, "Update note")
    }

    async fn delete_note(&self, id: &str) -> ApiResult<()> {
        let resp: AckResponse = self
            .request_api(reqwest::Method::DELETE, &Self::note_path(id), NO_BODY)
            .await?;
        check_ack(resp, "Delete note")
    }

    async fn share_note(&self, id: &str, req: &ShareRequest) -> ApiResult<String> {
        let path = format!("{}/share", Self::note_path(id));
        let resp: ShareResponse = self
            .request_api(reqwest::Method::POST, &path, Some(req))
            .await?;
        if !resp.success {
            return Err(ApiError::rejected("Share note", resp.error.as_deref()));
        }
        resp.share_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ApiError::parse("Share note: response is missing share_url"))
    }

    async fn unshare_note(&self, id: &str) -> ApiResult<()> {
        let path = format!("{}/unshare", Self::note_path(id));
        let resp: AckResponse = self
            .request_api(reqwest::Method::POST, &path, NO_BODY)
            .await?;
        check_ack(resp, "Unshare note")
    }
}
