use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::Url;
use serde_json::Value;
use tracker_logging::{tracker_debug, tracker_info};

use crate::{RecordStore, StoreError};

/// Longest error body kept from a failed response.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Project URL, e.g. `https://abc.example.co`.
    pub base_url: String,
    /// Public API key; sent as `apikey` and as the bearer token.
    pub api_key: String,
    /// Column the record id is matched against.
    pub key_column: String,
    /// Insert the record when an update matches no row.
    pub create_missing: bool,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl BackendSettings {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            key_column: "id".to_string(),
            create_missing: true,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Hosted backend speaking the PostgREST dialect:
/// `PATCH {base}/rest/v1/{table}?{key_column}=eq.{id}`.
///
/// An update that matches no row either inserts the record
/// (`create_missing`) or fails with [`StoreError::NotFound`].
#[derive(Debug, Clone)]
pub struct RestRecordStore {
    base: Url,
    api_key: String,
    key_column: String,
    create_missing: bool,
    client: reqwest::Client,
}

impl RestRecordStore {
    pub fn new(settings: BackendSettings) -> Result<Self, StoreError> {
        let mut base_url = settings.base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url)
            .map_err(|err| StoreError::Config(format!("base url {base_url:?}: {err}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(StoreError::Config(format!(
                "base url {base_url:?} must be http or https"
            )));
        }
        if !is_identifier(&settings.key_column) {
            return Err(StoreError::Config(format!(
                "key column {:?} is not a plain column name",
                settings.key_column
            )));
        }
        if settings.api_key.is_empty() {
            return Err(StoreError::Config("api key is empty".to_string()));
        }
        HeaderValue::from_str(&settings.api_key)
            .map_err(|_| StoreError::Config("api key is not a valid header value".to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| StoreError::Config(err.to_string()))?;

        Ok(Self {
            base,
            api_key: settings.api_key,
            key_column: settings.key_column,
            create_missing: settings.create_missing,
            client,
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        if !is_identifier(table) {
            return Err(StoreError::InvalidKey(table.to_string()));
        }
        self.base
            .join(&format!("rest/v1/{table}"))
            .map_err(|err| StoreError::Config(err.to_string()))
    }

    fn record_url(&self, table: &str, id: &str) -> Result<Url, StoreError> {
        if id.is_empty() {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        let mut url = self.table_url(table)?;
        url.query_pairs_mut()
            .append_pair(&self.key_column, &format!("eq.{id}"));
        Ok(url)
    }

    /// Reads one record back; `Ok(None)` when no row matches.
    pub async fn fetch_by_id(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let mut url = self.record_url(table, id)?;
        url.query_pairs_mut().append_pair("select", "*");

        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = check_status(response).await?;

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let rows: Vec<Value> = serde_json::from_slice(&bytes)?;
        Ok(rows.into_iter().next())
    }

    /// Creates the record, filling in the key column when the body lacks it.
    async fn insert(&self, table: &str, id: &str, body: &Value) -> Result<(), StoreError> {
        let url = self.table_url(table)?;
        let mut row = body.clone();
        match &mut row {
            Value::Object(fields) => {
                fields
                    .entry(self.key_column.clone())
                    .or_insert_with(|| Value::String(id.to_string()));
            }
            _ => {
                return Err(StoreError::InvalidKey(format!(
                    "{table}/{id}: body is not an object"
                )))
            }
        }
        let payload = serde_json::to_vec(&row)?;

        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(response).await?;

        tracker_info!("created {}/{}", table, id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for RestRecordStore {
    async fn update_by_id(
        &self,
        table: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), StoreError> {
        let url = self.record_url(table, id)?;
        let payload = serde_json::to_vec(body)?;

        let response = self
            .client
            .patch(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        // An empty body means the server sent no representation: no row matched.
        let matched = if bytes.iter().all(u8::is_ascii_whitespace) {
            0
        } else {
            serde_json::from_slice::<Vec<Value>>(&bytes)?.len()
        };

        if matched > 0 {
            tracker_debug!("updated {}/{} ({} row(s))", table, id, matched);
            return Ok(());
        }
        if !self.create_missing {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        tracker_debug!("no row for {}/{}; inserting", table, id);
        self.insert(table, id, body).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(StoreError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}

/// Table and column names are interpolated into request paths and filters.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn map_reqwest_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        return StoreError::Timeout(err.to_string());
    }
    StoreError::Network(err.to_string())
}
