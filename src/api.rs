//! HTTP contract with the drive server.
//!
//! `DriveApi` is the seam between orchestration and transport. `HttpDriveApi`
//! talks to a live server through reqwest; tests substitute a scripted double.

use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};
use crate::sync_engine::types::{
    ClientSnapshot, DriveSnapshot, MappingState, RumbleConfig, SearchResults, SlotIndex,
    StateUpdate, WatchResponse,
};
use crate::upload::{LoadPayload, LoadRequest};

/// Status the server uses on `/watch` when its hold period elapsed without change.
pub const NO_UPDATE_STATUS: StatusCode = StatusCode::BAD_GATEWAY;

const JSON: &str = "application/json";

pub trait DriveApi: Send + Sync + 'static {
    /// `GET /list`
    fn list_drives(&self) -> impl Future<Output = ClientResult<DriveSnapshot>> + Send;

    /// `GET /status`
    fn client_status(&self) -> impl Future<Output = ClientResult<ClientSnapshot>> + Send;

    /// `GET /watch`, held open by the server until something changes.
    fn watch(&self) -> impl Future<Output = ClientResult<WatchResponse>> + Send;

    /// `PUT /drive/{n}`
    fn load(&self, request: &LoadRequest) -> impl Future<Output = ClientResult<String>> + Send;

    /// `GET /drive/{n}/list`
    fn list_files(&self, slot: SlotIndex) -> impl Future<Output = ClientResult<String>> + Send;

    /// `PUT /drive/{n}/unload?force=true`
    fn unload(&self, slot: SlotIndex) -> impl Future<Output = ClientResult<String>> + Send;

    /// `PUT /resync?reset=true`
    fn resync(&self) -> impl Future<Output = ClientResult<String>> + Send;

    /// `GET /map`
    fn get_mapping(&self) -> impl Future<Output = ClientResult<MappingState>> + Send;

    /// `PUT /map/?start=&end=`
    fn set_mapping(&self, start: u8, end: u8)
        -> impl Future<Output = ClientResult<String>> + Send;

    /// `GET /config?item=rumble`
    fn get_rumble(&self) -> impl Future<Output = ClientResult<RumbleConfig>> + Send;

    /// `PUT /config?item=rumble&arg1=<level>`
    fn set_rumble(&self, level: u8) -> impl Future<Output = ClientResult<String>> + Send;

    /// `GET /search?items=N&term=T`
    fn search(&self, term: &str, items: usize)
        -> impl Future<Output = ClientResult<SearchResults>> + Send;

    /// `GET /version`
    fn version(&self) -> impl Future<Output = ClientResult<String>> + Send;
}

pub struct HttpDriveApi {
    client: Client,
    base: Url,
}

impl HttpDriveApi {
    pub fn new(server: &str) -> ClientResult<Self> {
        let mut base = Url::parse(server).map_err(|e| ClientError::Config(e.to_string()))?;
        // relative joins below only keep a path prefix when it ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder().build()?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Config(format!("bad endpoint {path}: {e}")))
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let request = self
            .client
            .get(self.url(path)?)
            .query(query)
            .header(CONTENT_TYPE, JSON);
        let body = self.send(path, request).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_text(&self, path: &str) -> ClientResult<String> {
        let request = self.client.get(self.url(path)?).header(CONTENT_TYPE, JSON);
        Ok(self.send(path, request).await?.text().await?)
    }

    async fn put_text(&self, path: &str, query: &[(&str, String)]) -> ClientResult<String> {
        let request = self
            .client
            .put(self.url(path)?)
            .query(query)
            .header(CONTENT_TYPE, JSON);
        Ok(self.send(path, request).await?.text().await?)
    }
}

impl DriveApi for HttpDriveApi {
    async fn list_drives(&self) -> ClientResult<DriveSnapshot> {
        self.get_json("list", &[]).await
    }

    async fn client_status(&self) -> ClientResult<ClientSnapshot> {
        self.get_json("status", &[]).await
    }

    async fn watch(&self) -> ClientResult<WatchResponse> {
        let response = self
            .client
            .get(self.url("watch")?)
            .header(CONTENT_TYPE, JSON)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                let update: StateUpdate = serde_json::from_slice(&body)?;
                Ok(WatchResponse::Update(update))
            }
            NO_UPDATE_STATUS => Ok(WatchResponse::NoUpdate),
            other => Err(ClientError::UnexpectedStatus {
                endpoint: "watch".to_string(),
                status: other.as_u16(),
            }),
        }
    }

    async fn load(&self, request: &LoadRequest) -> ClientResult<String> {
        let path = format!("drive/{}", request.slot);
        let mut query = vec![
            ("type", request.format.as_str().to_string()),
            ("compressor", request.compressor.as_str().to_string()),
            ("repair", "true".to_string()),
            ("name", request.name.clone()),
        ];

        // raw uploads go without a JSON content type
        let builder = match &request.payload {
            LoadPayload::Bytes(bytes) => self.client.put(self.url(&path)?).body(bytes.clone()),
            LoadPayload::Reference(reference) => {
                query.push(("ref", "true".to_string()));
                self.client.put(self.url(&path)?).body(reference.clone())
            }
        };

        Ok(self.send(&path, builder.query(&query)).await?.text().await?)
    }

    async fn list_files(&self, slot: SlotIndex) -> ClientResult<String> {
        self.get_text(&format!("drive/{slot}/list")).await
    }

    async fn unload(&self, slot: SlotIndex) -> ClientResult<String> {
        self.put_text(&format!("drive/{slot}/unload"), &[("force", "true".to_string())])
            .await
    }

    async fn resync(&self) -> ClientResult<String> {
        self.put_text("resync", &[("reset", "true".to_string())]).await
    }

    async fn get_mapping(&self) -> ClientResult<MappingState> {
        self.get_json("map", &[]).await
    }

    async fn set_mapping(&self, start: u8, end: u8) -> ClientResult<String> {
        self.put_text(
            "map/",
            &[("start", start.to_string()), ("end", end.to_string())],
        )
        .await
    }

    async fn get_rumble(&self) -> ClientResult<RumbleConfig> {
        self.get_json("config", &[("item", "rumble".to_string())]).await
    }

    async fn set_rumble(&self, level: u8) -> ClientResult<String> {
        self.put_text(
            "config",
            &[("item", "rumble".to_string()), ("arg1", level.to_string())],
        )
        .await
    }

    async fn search(&self, term: &str, items: usize) -> ClientResult<SearchResults> {
        self.get_json(
            "search",
            &[("items", items.to_string()), ("term", term.to_string())],
        )
        .await
    }

    async fn version(&self) -> ClientResult<String> {
        self.get_text("version").await
    }
}
