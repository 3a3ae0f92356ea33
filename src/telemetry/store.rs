//! Typed reads and writes over the three telemetry collections.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use super::error::RequestError;
use super::models::{
    ASSETS, Asset, AssetUpdate, DEVICE_LOAD_STATS, DEVICE_METRICS_SUMMARY, DeviceLoadStat,
    DeviceStatFields, MetricSummaryRecord, NewDeviceStat,
};
use super::rest_client::{Prefer, RestTransport};

/// One fetched row, or the reason it could not be decoded.
pub type FetchedRow<R> = Result<R, RequestError>;

/// Column the summary collection is unique on.
pub const METRIC_SUMMARY_CONFLICT_COLUMN: &str = "metric_name";

pub struct TelemetryStore<T: RestTransport> {
    transport: T,
}

impl<T: RestTransport> TelemetryStore<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn fetch_assets(&self) -> Result<Vec<FetchedRow<Asset>>, RequestError> {
        info!("Fetching existing assets...");
        self.fetch_all(ASSETS).await
    }

    pub async fn fetch_device_stats(
        &self,
    ) -> Result<Vec<FetchedRow<DeviceLoadStat>>, RequestError> {
        info!("Fetching existing device load statistics...");
        self.fetch_all(DEVICE_LOAD_STATS).await
    }

    pub async fn update_asset(
        &self,
        mac_address: &str,
        updates: &AssetUpdate,
    ) -> Result<(), RequestError> {
        info!(mac_address, "Updating asset...");
        let path = eq_filter(ASSETS, "mac_address", mac_address);
        self.write(Method::PATCH, &path, updates, Prefer::Minimal).await
    }

    pub async fn update_device_stat(
        &self,
        id: i64,
        updates: &DeviceStatFields,
    ) -> Result<(), RequestError> {
        info!(id, "Updating device load stat...");
        let path = eq_filter(DEVICE_LOAD_STATS, "id", &id.to_string());
        self.write(Method::PATCH, &path, updates, Prefer::Minimal).await
    }

    pub async fn insert_device_stat(&self, stat: &NewDeviceStat) -> Result<(), RequestError> {
        info!(device_name = %stat.device_name, "Inserting new device load stat...");
        self.write(Method::POST, DEVICE_LOAD_STATS, stat, Prefer::Minimal).await
    }

    /// Inserts the record, replacing any existing row with the same `metric_name`.
    pub async fn upsert_metric_summary(
        &self,
        record: &MetricSummaryRecord,
    ) -> Result<(), RequestError> {
        let path = format!("{DEVICE_METRICS_SUMMARY}?on_conflict={METRIC_SUMMARY_CONFLICT_COLUMN}");
        self.write(Method::POST, &path, record, Prefer::MergeDuplicates).await
    }

    /// The body must be a JSON list; each element is decoded on its own so a
    /// malformed row does not hide the rest of the collection.
    async fn fetch_all<R: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<FetchedRow<R>>, RequestError> {
        let method = Method::GET;
        let prefer = Prefer::for_method(&method);
        let response = self.transport.send(method, collection, None, prefer).await?;
        let rows: Vec<Value> = match response {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        Ok(rows
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(RequestError::from))
            .collect())
    }

    async fn write<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        prefer: Prefer,
    ) -> Result<(), RequestError> {
        let body: Value = serde_json::to_value(body)?;
        self.transport
            .send(method, path, Some(&body), prefer)
            .await
            .map(|_| ())
    }
}

/// `collection?column=eq.value` with the value percent-encoded.
pub fn eq_filter(collection: &str, column: &str, value: &str) -> String {
    format!("{collection}?{column}=eq.{}", urlencoding::encode(value))
}
