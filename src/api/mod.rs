//! HTTP client for the Seedr resource API.
//!
//! Every resource call is a form POST to `resource_url` with the access token
//! and the function name in the query string. Failures are classified into
//! [`RemoteErrorKind`]s; a rejected token is refreshed once and the call
//! retried.

pub mod token;
pub mod wire;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::ApiConfig;
use crate::error::{Error, RemoteErrorKind, Result};
use crate::remote::{
    AddTorrentOutcome, ArchiveLink, FileId, FileLink, FolderId, RemoteStore, Snapshot,
    TorrentSource,
};

pub use self::token::{Token, TokenStore};
pub use self::wire::DeviceCode;

/// Folder id the service expects for "add to the root folder".
const ADD_TO_ROOT: &str = "-1";

/// Builds the shared HTTP client.
///
/// # Errors
/// Returns [`Error::Http`] if the TLS backend cannot be initialised.
pub fn http_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("seedr-dl/", env!("CARGO_PKG_VERSION"))),
    );
    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

/// Request body of a resource call. Kept as data so a call can be replayed
/// after a token refresh.
#[derive(Debug, Clone)]
enum Payload {
    Form(Vec<(&'static str, String)>),
    Upload {
        fields: Vec<(&'static str, String)>,
        field: &'static str,
        file_name: String,
        bytes: Vec<u8>,
    },
}

impl Payload {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Form(fields) => request.form(fields),
            Self::Upload {
                fields,
                field,
                file_name,
                bytes,
            } => {
                let mut form = multipart::Form::new();
                for (key, value) in fields {
                    form = form.text(*key, value.clone());
                }
                let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                request.multipart(form.part(*field, part))
            }
        }
    }
}

/// [`RemoteStore`] backed by the Seedr HTTP API.
pub struct SeedrClient {
    http: reqwest::Client,
    api: ApiConfig,
    token: Mutex<Token>,
    store: Option<TokenStore>,
}

impl SeedrClient {
    pub fn new(http: reqwest::Client, api: ApiConfig, token: Token) -> Self {
        Self {
            http,
            api,
            token: Mutex::new(token),
            store: None,
        }
    }

    /// Persists refreshed tokens to `store`.
    #[must_use]
    pub fn with_token_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Current credentials.
    pub async fn token(&self) -> Token {
        self.token.lock().await.clone()
    }

    /// Requests a device code for the login flow.
    ///
    /// # Errors
    /// Returns a classified [`Error::Remote`] if the endpoint fails.
    pub async fn request_device_code(http: &reqwest::Client, api: &ApiConfig) -> Result<DeviceCode> {
        let response = http
            .get(&api.device_code_url)
            .query(&[("client_id", api.device_client_id.as_str())])
            .send()
            .await
            .map_err(network)?;
        let code: DeviceCode = from_body(decode(response).await?)?;
        if code.device_code.is_empty() || code.user_code.is_empty() {
            return Err(Error::remote(
                RemoteErrorKind::Api,
                "device code response is missing its codes",
            ));
        }
        Ok(code)
    }

    /// Exchanges an authorised device code for a token.
    ///
    /// # Errors
    /// Returns an [`RemoteErrorKind::Authentication`] error if the code was not
    /// authorised or the response carries no access token.
    pub async fn authorize_device(
        http: &reqwest::Client,
        api: &ApiConfig,
        device_code: &str,
    ) -> Result<Token> {
        let grant = request_grant(device_grant(http, api, device_code))
            .await
            .map_err(|e| {
                Error::remote(
                    RemoteErrorKind::Authentication,
                    format!("failed to authorize device: {}", detail(&e)),
                )
            })?;
        let mut token = Token::new(grant.access_token).with_device_code(device_code);
        token.refresh_token = grant.refresh_token;
        Ok(token)
    }

    /// Runs `func`, refreshing the token and retrying once if it was rejected.
    async fn call(&self, func: &'static str, payload: &Payload) -> Result<Value> {
        let access = self.token.lock().await.access_token.clone();
        match self.resource(func, payload, &access).await {
            Err(e) if e.remote_kind() == Some(RemoteErrorKind::Authentication) => {
                log::info!("Access token rejected during {func}, refreshing");
                let access = self.refresh_after(&access).await?;
                self.resource(func, payload, &access).await
            }
            other => other,
        }
    }

    async fn resource(&self, func: &'static str, payload: &Payload, access: &str) -> Result<Value> {
        log::debug!("POST {} func={func}", self.api.resource_url);
        let request = self
            .http
            .post(&self.api.resource_url)
            .query(&[("access_token", access), ("func", func)]);
        let response = payload.apply(request).send().await.map_err(network)?;
        decode(response).await
    }

    /// Replaces the token if it is still `stale`, returning the access token to use.
    async fn refresh_after(&self, stale: &str) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.access_token != stale {
            // Another call refreshed while this one waited for the lock.
            return Ok(token.access_token.clone());
        }

        let grant = self.renew(&token).await.map_err(|e| {
            log::error!("Token refresh failed: {e}");
            Error::remote(
                RemoteErrorKind::Authentication,
                format!("failed to refresh token: {}", detail(&e)),
            )
        })?;
        token.access_token = grant.access_token;
        if let Some(refresh) = grant.refresh_token {
            token.refresh_token = Some(refresh);
        }
        log::info!("Access token refreshed");

        if let Some(store) = &self.store
            && let Err(e) = store.save(&token).await
        {
            log::warn!("Could not persist refreshed token: {e}");
        }
        Ok(token.access_token.clone())
    }

    async fn renew(&self, token: &Token) -> Result<wire::Grant> {
        let refresh = token.refresh_token.as_deref().filter(|s| !s.is_empty());
        let device = token.device_code.as_deref().filter(|s| !s.is_empty());
        let request = match (refresh, device) {
            (Some(refresh), _) => self.http.post(&self.api.token_url).form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh),
                ("client_id", self.api.password_client_id.as_str()),
            ]),
            (None, Some(code)) => device_grant(&self.http, &self.api, code),
            (None, None) => {
                return Err(Error::remote(
                    RemoteErrorKind::Authentication,
                    "session expired and no refresh token or device code is available",
                ));
            }
        };
        request_grant(request).await
    }
}

fn device_grant(http: &reqwest::Client, api: &ApiConfig, device_code: &str) -> RequestBuilder {
    http.get(&api.device_authorize_url).query(&[
        ("client_id", api.device_client_id.as_str()),
        ("device_code", device_code),
    ])
}

async fn request_grant(request: RequestBuilder) -> Result<wire::Grant> {
    let response = request.send().await.map_err(network)?;
    let grant: wire::Grant = from_body(decode(response).await?)?;
    if grant.access_token.is_empty() {
        return Err(Error::remote(
            RemoteErrorKind::Authentication,
            "token response did not contain an access token",
        ));
    }
    Ok(grant)
}

fn network(e: reqwest::Error) -> Error {
    Error::remote(RemoteErrorKind::Network, e.to_string())
}

/// Message of a remote error without its kind prefix.
fn detail(e: &Error) -> String {
    match e {
        Error::Remote { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Reads a response body and classifies HTTP-level failures.
async fn decode(response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.bytes().await.map_err(network)?;
    let json = serde_json::from_slice::<Value>(&body).ok();
    let reason = json.as_ref().and_then(describe);

    if status.is_server_error() {
        return Err(Error::remote(
            RemoteErrorKind::Server,
            format!("HTTP {status}"),
        ));
    }
    if status == StatusCode::UNAUTHORIZED || json.as_ref().is_some_and(is_expired) {
        return Err(Error::remote(
            RemoteErrorKind::Authentication,
            reason.unwrap_or_else(|| format!("HTTP {status}")),
        ));
    }
    if status.is_client_error() {
        let message = match reason {
            Some(reason) => format!("HTTP {status}: {reason}"),
            None => format!("HTTP {status}"),
        };
        return Err(Error::remote(RemoteErrorKind::Api, message));
    }
    json.ok_or_else(|| Error::remote(RemoteErrorKind::Api, "response is not valid JSON"))
}

fn describe(body: &Value) -> Option<String> {
    ["error_description", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn is_expired(body: &Value) -> bool {
    ["error", "result"]
        .iter()
        .any(|key| body.get(*key).and_then(Value::as_str) == Some("expired_token"))
}

/// Rejects `result: false` bodies.
fn ensure_ok(body: Value) -> Result<Value> {
    if body.get("result").and_then(Value::as_bool) == Some(false) {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request rejected by the service");
        return Err(Error::remote(RemoteErrorKind::Api, message));
    }
    Ok(body)
}

fn from_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|e| Error::remote(RemoteErrorKind::Api, format!("unexpected response: {e}")))
}

/// Ids are numeric on the wire; anything else is passed through as text.
fn wire_id(id: &str) -> Value {
    id.parse::<u64>()
        .map_or_else(|_| Value::String(id.to_string()), Value::from)
}

impl SeedrClient {
    /// Deletes one item of `kind` ("file" or "folder").
    async fn delete_item(&self, kind: &str, id: &str) -> Result<()> {
        let items = serde_json::json!([{ "type": kind, "id": wire_id(id) }]);
        let payload = Payload::Form(vec![("delete_arr", items.to_string())]);
        ensure_ok(self.call("delete", &payload).await?)?;
        log::info!("Deleted {kind} {id}");
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for SeedrClient {
    async fn list_contents(&self, folder: &FolderId) -> Result<Snapshot> {
        let payload = Payload::Form(vec![
            ("content_type", "folder".to_string()),
            ("content_id", folder.to_string()),
        ]);
        let body = ensure_ok(self.call("list_contents", &payload).await?)?;
        let listing: wire::Listing = from_body(body)?;
        let snapshot = listing.into_snapshot(folder);
        log::debug!("Listed folder {folder}: {} entries", snapshot.len());
        Ok(snapshot)
    }

    async fn fetch_file_url(&self, file: &FileId) -> Result<FileLink> {
        let payload = Payload::Form(vec![("folder_file_id", file.to_string())]);
        let body = ensure_ok(self.call("fetch_file", &payload).await?)?;
        let fetched: wire::FetchFile = from_body(body)?;
        if fetched.url.is_empty() {
            return Err(Error::remote(
                RemoteErrorKind::Api,
                format!("no download URL returned for file {file}"),
            ));
        }
        Ok(fetched.into())
    }

    async fn create_archive(&self, folder: &FolderId) -> Result<ArchiveLink> {
        let archive = serde_json::json!([{ "type": "folder", "id": wire_id(folder.as_str()) }]);
        let payload = Payload::Form(vec![("archive_arr", archive.to_string())]);
        let body = ensure_ok(self.call("create_empty_archive", &payload).await?)?;
        let created: wire::Archive = from_body(body)?;
        if created.archive_url.is_empty() {
            return Err(Error::remote(
                RemoteErrorKind::Api,
                format!("no archive URL returned for folder {folder}"),
            ));
        }
        Ok(created.into())
    }

    async fn add_torrent(&self, source: TorrentSource, folder: &FolderId) -> Result<AddTorrentOutcome> {
        let target = if folder.is_root() {
            ADD_TO_ROOT.to_string()
        } else {
            folder.to_string()
        };
        let mut fields = vec![("folder_id", target)];
        let payload = match source {
            TorrentSource::Magnet(magnet) => {
                fields.push(("torrent_magnet", magnet));
                Payload::Form(fields)
            }
            TorrentSource::Wishlist(id) => {
                fields.push(("wishlist_id", id));
                Payload::Form(fields)
            }
            TorrentSource::File { name, bytes } => Payload::Upload {
                fields,
                field: "torrent_file",
                file_name: name,
                bytes,
            },
        };

        // `result: false` carries outcomes the caller reports, so it is not rejected here.
        let added: wire::AddTorrent = from_body(self.call("add_torrent", &payload).await?)?;
        if added.result == Some(false) && added.code != Some(409) {
            if added.error.contains("not_enough_space") {
                return Err(Error::remote(
                    RemoteErrorKind::Api,
                    "not enough space to add the torrent",
                ));
            }
            if !added.error.is_empty() {
                return Err(Error::remote(RemoteErrorKind::Api, added.error));
            }
        }
        Ok(added.into())
    }

    async fn delete_file(&self, file: &FileId) -> Result<()> {
        self.delete_item("file", file.as_str()).await
    }

    async fn delete_folder(&self, folder: &FolderId) -> Result<()> {
        self.delete_item("folder", folder.as_str()).await
    }
}
