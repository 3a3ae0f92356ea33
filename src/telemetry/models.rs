use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ASSETS: &str = "assets";
pub const DEVICE_LOAD_STATS: &str = "device_load_stats";
pub const DEVICE_METRICS_SUMMARY: &str = "device_metrics_summary";

/// A row of the `assets` collection as returned by the store.
/// Columns this tool does not touch are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub mac_address: String,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub signal_strength: Option<i32>,
    #[serde(default)]
    pub download_bps: Option<i64>,
    #[serde(default)]
    pub upload_bps: Option<i64>,
    #[serde(default)]
    pub usage_mb: Option<i64>,
    #[serde(default)]
    pub experience: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Experience {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Experience {
    pub const ALL: [Experience; 4] = [
        Experience::Excellent,
        Experience::Good,
        Experience::Fair,
        Experience::Poor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Experience::Excellent => "Excellent",
            Experience::Good => "Good",
            Experience::Fair => "Fair",
            Experience::Poor => "Poor",
        }
    }
}

/// PATCH body for one asset. `None` fields are left out of the request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssetUpdate {
    pub last_seen: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_bps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_bps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_mb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Active,
    Halted,
    Limited,
}

impl CollectionStatus {
    /// Reasons a device may report for a non-active status.
    pub fn reasons(&self) -> &'static [&'static str] {
        match self {
            CollectionStatus::Active => &[],
            CollectionStatus::Halted => &[
                "CPU Overload",
                "Memory Exhaustion",
                "Critical Error",
                "System Failure",
            ],
            CollectionStatus::Limited => &[
                "High Load",
                "Memory Pressure",
                "Network Congestion",
                "Resource Contention",
            ],
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CollectionStatus::Active => "active",
            CollectionStatus::Halted => "halted",
            CollectionStatus::Limited => "limited",
        };
        f.write_str(s)
    }
}

/// A row of the `device_load_stats` collection. Only `id` is required for
/// the update path; the remaining columns are read for logging.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceLoadStat {
    pub id: i64,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub collection_status: Option<String>,
    #[serde(default)]
    pub status_reason: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// The randomized measurement columns shared by updates and inserts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeviceStatFields {
    pub load_avg_1m: f64,
    pub load_avg_5m: f64,
    pub load_avg_15m: f64,
    pub memory_used_percent: f64,
    pub storage_used_percent: f64,
    pub traffic_in_mbps: f64,
    pub traffic_out_mbps: f64,
    pub collection_status: CollectionStatus,
    /// Always serialized so an update to `active` clears a stale reason.
    pub status_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// POST body for a new `device_load_stats` row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewDeviceStat {
    pub device_name: String,
    #[serde(flatten)]
    pub fields: DeviceStatFields,
}

/// One entry of the `device_metrics_summary` feed, unique on `metric_name`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricSummaryRecord {
    pub metric_name: String,
    pub metric_value: f64,
    pub device_count: i64,
}
