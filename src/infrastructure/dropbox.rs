use crate::domain::ports::{RemoteDocument, RemoteStore};
use crate::error::{BotError, Result};
use async_trait::async_trait;
use serde_json::json;

const API_BASE: &str = "https://api.dropboxapi.com/2";
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

/// Document store backed by the Dropbox HTTP API v2.
///
/// `files/get_metadata` supplies the revision token for cache revalidation;
/// `files/download` returns the body with its metadata in the
/// `Dropbox-API-Result` response header.
#[derive(Clone)]
pub struct DropboxStore {
    client: reqwest::Client,
    token: String,
}

impl DropboxStore {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    /// Reads the access token from `DROPBOX_ACCESS_TOKEN`. Without it no
    /// lookup can ever succeed, so the caller should treat the error as
    /// fatal.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("DROPBOX_ACCESS_TOKEN")
            .map_err(|_| BotError::Config("DROPBOX_ACCESS_TOKEN is not set".to_string()))?;
        Ok(Self::new(token))
    }
}

#[async_trait]
impl RemoteStore for DropboxStore {
    async fn get_metadata(&self, path: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{API_BASE}/files/get_metadata"))
            .bearer_auth(&self.token)
            .json(&json!({ "path": path }))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        body["rev"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BotError::Fetch(format!("no rev in metadata for {path}")))
    }

    async fn download(&self, path: &str) -> Result<RemoteDocument> {
        let arg = json!({ "path": path }).to_string();
        let response = self
            .client
            .post(format!("{CONTENT_BASE}/files/download"))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await?
            .error_for_status()?;

        let result_header = response
            .headers()
            .get("dropbox-api-result")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BotError::Fetch(format!("no api-result header for {path}")))?;
        let meta: serde_json::Value = serde_json::from_str(result_header)?;

        let rev = meta["rev"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BotError::Fetch(format!("no rev in download result for {path}")))?;
        let server_modified = meta["server_modified"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let bytes = response.bytes().await?.to_vec();
        Ok(RemoteDocument {
            bytes,
            rev,
            server_modified,
        })
    }
}
