// Thin client for the hosted table store (PostgREST interface).
//
// The store keeps exactly one uploaded report at a time: saving is a full
// replace (delete everything, then insert the new record set), never a
// merge. Transport is plain blocking HTTP with no retry layer.
use crate::error::StoreError;
use crate::types::Record;
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::env;
use tracing::info;

pub const DEFAULT_TABLE: &str = "monitoring_data";

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
    pub table: String,
}

impl StoreConfig {
    /// Read the store coordinates from the environment:
    /// `SUPABASE_URL`, `SUPABASE_KEY` and optionally `MONITORING_TABLE`.
    pub fn from_env() -> Result<Self, StoreError> {
        Ok(Self {
            url: require("SUPABASE_URL")?,
            key: require("SUPABASE_KEY")?,
            table: env::var("MONITORING_TABLE").unwrap_or_else(|_| DEFAULT_TABLE.to_string()),
        })
    }
}

fn require(name: &'static str) -> Result<String, StoreError> {
    env::var(name).map_err(|_| StoreError::Config { name })
}

pub struct TableStore {
    client: Client,
    config: StoreConfig,
}

impl TableStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.key)
            .bearer_auth(&self.config.key)
    }

    fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Fetch the whole stored record set.
    pub fn fetch_all(&self) -> Result<Vec<Record>, StoreError> {
        let response = self
            .authorize(self.client.get(self.endpoint()))
            .query(&[("select", "*")])
            .send()?;
        let records: Vec<Record> = Self::check(response)?.json()?;
        info!(rows = records.len(), "fetched stored record set");
        Ok(records)
    }

    /// Replace the stored record set wholesale.
    pub fn replace_all(&self, records: &[Record]) -> Result<(), StoreError> {
        self.delete_all()?;
        if records.is_empty() {
            return Ok(());
        }
        let response = self
            .authorize(self.client.post(self.endpoint()))
            .header("Prefer", "return=minimal")
            .json(records)
            .send()?;
        Self::check(response)?;
        info!(rows = records.len(), "stored record set");
        Ok(())
    }

    /// Drop everything that is stored.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.delete_all()?;
        info!("cleared stored record set");
        Ok(())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.delete(self.endpoint()))
            .query(&[("id", "neq.0")])
            .send()?;
        Self::check(response)?;
        Ok(())
    }
}
