//! Randomized field generation for assets, device load stats and the
//! metrics summary feed. Every function takes its random source so runs can
//! be replayed from a seed.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::ops::RangeInclusive;

use super::models::{
    Asset, AssetUpdate, CollectionStatus, DeviceLoadStat, DeviceStatFields, Experience,
    MetricSummaryRecord, NewDeviceStat,
};

/// Chance that a fetched asset is left untouched.
pub const ASSET_SKIP_PROBABILITY: f64 = 0.7;
/// Chance that each asset field is redrawn rather than kept.
pub const ASSET_FIELD_REDRAW_PROBABILITY: f64 = 0.7;
/// Chance that a device stat row is updated in place instead of spawning a new device.
pub const DEVICE_UPDATE_PROBABILITY: f64 = 0.7;

pub const SIGNAL_STRENGTH_RANGE: RangeInclusive<i32> = -90..=-30;
pub const DOWNLOAD_BPS_RANGE: RangeInclusive<i64> = 1_000_000..=300_000_000;
pub const UPLOAD_BPS_RANGE: RangeInclusive<i64> = 500_000..=100_000_000;
pub const USAGE_INCREMENT_MB_RANGE: RangeInclusive<i64> = 10..=500;

pub const STATUS_WEIGHTS: [(CollectionStatus, f64); 3] = [
    (CollectionStatus::Active, 0.8),
    (CollectionStatus::Halted, 0.1),
    (CollectionStatus::Limited, 0.1),
];

pub const SEED_DEVICE_NAMES: [&str; 5] = [
    "router-main",
    "switch-core",
    "firewall-edge",
    "access-point-1",
    "server-primary",
];

/// Bounds for the numeric device stat columns. Loads keep two decimals,
/// percentages and traffic one.
#[derive(Debug, Clone)]
pub struct DeviceStatRanges {
    pub load_avg_1m: (f64, f64),
    pub load_avg_5m: (f64, f64),
    pub load_avg_15m: (f64, f64),
    pub memory_used_percent: (f64, f64),
    pub storage_used_percent: (f64, f64),
    pub traffic_in_mbps: (f64, f64),
    pub traffic_out_mbps: (f64, f64),
}

pub const UPDATE_RANGES: DeviceStatRanges = DeviceStatRanges {
    load_avg_1m: (0.01, 8.0),
    load_avg_5m: (0.01, 6.0),
    load_avg_15m: (0.01, 5.0),
    memory_used_percent: (10.0, 95.0),
    storage_used_percent: (20.0, 90.0),
    traffic_in_mbps: (1.0, 500.0),
    traffic_out_mbps: (0.5, 300.0),
};

/// Calmer values for freshly seeded devices.
pub const SEED_RANGES: DeviceStatRanges = DeviceStatRanges {
    load_avg_1m: (0.01, 3.0),
    load_avg_5m: (0.01, 2.5),
    load_avg_15m: (0.01, 2.0),
    memory_used_percent: (10.0, 80.0),
    storage_used_percent: (20.0, 70.0),
    traffic_in_mbps: (1.0, 200.0),
    traffic_out_mbps: (0.5, 100.0),
};

/// What to do with one fetched device stat row.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceStatAction {
    Update { id: i64, fields: DeviceStatFields },
    Insert(NewDeviceStat),
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn uniform_rounded<R: Rng + ?Sized>(rng: &mut R, (low, high): (f64, f64), decimals: i32) -> f64 {
    round_to(rng.random_range(low..=high), decimals)
}

/// Returns `None` when the asset should be skipped this round.
pub fn plan_asset_update<R: Rng + ?Sized>(
    asset: &Asset,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Option<AssetUpdate> {
    if rng.random_bool(ASSET_SKIP_PROBABILITY) {
        return None;
    }

    let signal_strength = if rng.random_bool(ASSET_FIELD_REDRAW_PROBABILITY) {
        Some(rng.random_range(SIGNAL_STRENGTH_RANGE))
    } else {
        asset.signal_strength
    };
    let download_bps = if rng.random_bool(ASSET_FIELD_REDRAW_PROBABILITY) {
        Some(rng.random_range(DOWNLOAD_BPS_RANGE))
    } else {
        asset.download_bps
    };
    let upload_bps = if rng.random_bool(ASSET_FIELD_REDRAW_PROBABILITY) {
        Some(rng.random_range(UPLOAD_BPS_RANGE))
    } else {
        asset.upload_bps
    };
    let usage_mb = if rng.random_bool(ASSET_FIELD_REDRAW_PROBABILITY) {
        Some(
            asset
                .usage_mb
                .unwrap_or(0)
                .saturating_add(rng.random_range(USAGE_INCREMENT_MB_RANGE)),
        )
    } else {
        asset.usage_mb
    };
    let experience = if rng.random_bool(ASSET_FIELD_REDRAW_PROBABILITY) {
        Experience::ALL.choose(rng).map(|e| e.as_str().to_string())
    } else {
        asset.experience.clone()
    };

    Some(AssetUpdate {
        last_seen: now,
        signal_strength,
        download_bps,
        upload_bps,
        usage_mb,
        experience,
    })
}

pub fn random_status<R: Rng + ?Sized>(rng: &mut R) -> (CollectionStatus, Option<String>) {
    let status = STATUS_WEIGHTS
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(status, _)| *status)
        .unwrap_or(CollectionStatus::Active);
    let reason = status
        .reasons()
        .choose(rng)
        .map(|reason| reason.to_string());
    (status, reason)
}

pub fn random_device_fields<R: Rng + ?Sized>(
    rng: &mut R,
    ranges: &DeviceStatRanges,
    collection_status: CollectionStatus,
    status_reason: Option<String>,
    now: DateTime<Utc>,
) -> DeviceStatFields {
    DeviceStatFields {
        load_avg_1m: uniform_rounded(rng, ranges.load_avg_1m, 2),
        load_avg_5m: uniform_rounded(rng, ranges.load_avg_5m, 2),
        load_avg_15m: uniform_rounded(rng, ranges.load_avg_15m, 2),
        memory_used_percent: uniform_rounded(rng, ranges.memory_used_percent, 1),
        storage_used_percent: uniform_rounded(rng, ranges.storage_used_percent, 1),
        traffic_in_mbps: uniform_rounded(rng, ranges.traffic_in_mbps, 1),
        traffic_out_mbps: uniform_rounded(rng, ranges.traffic_out_mbps, 1),
        collection_status,
        status_reason,
        timestamp: now,
    }
}

/// `device-` followed by eight hex characters drawn from `rng`.
pub fn random_device_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
    let hex = id.simple().to_string();
    format!("device-{}", &hex[..8])
}

pub fn plan_device_stat_action<R: Rng + ?Sized>(
    stat: &DeviceLoadStat,
    rng: &mut R,
    now: DateTime<Utc>,
) -> DeviceStatAction {
    let should_update = rng.random_bool(DEVICE_UPDATE_PROBABILITY);
    let (status, reason) = random_status(rng);
    let fields = random_device_fields(rng, &UPDATE_RANGES, status, reason, now);

    if should_update {
        DeviceStatAction::Update {
            id: stat.id,
            fields,
        }
    } else {
        DeviceStatAction::Insert(NewDeviceStat {
            device_name: random_device_name(rng),
            fields,
        })
    }
}

/// One active row per default device, for an empty collection.
pub fn seed_device_stats<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Vec<NewDeviceStat> {
    SEED_DEVICE_NAMES
        .iter()
        .map(|name| NewDeviceStat {
            device_name: name.to_string(),
            fields: random_device_fields(rng, &SEED_RANGES, CollectionStatus::Active, None, now),
        })
        .collect()
}

/// How a summary metric's value is drawn.
#[derive(Debug, Clone, Copy)]
pub enum SummaryValue {
    /// Uniform float rounded to the given number of decimals.
    Decimal { low: f64, high: f64, decimals: i32 },
    /// Uniform integer.
    Count { low: i64, high: i64 },
}

pub struct SummaryMetricSpec {
    pub name: &'static str,
    pub value: SummaryValue,
    pub device_count: (i64, i64),
}

pub const SUMMARY_METRICS: [SummaryMetricSpec; 8] = [
    SummaryMetricSpec {
        name: "avg_cpu_load",
        value: SummaryValue::Decimal { low: 0.1, high: 5.0, decimals: 2 },
        device_count: (5, 50),
    },
    SummaryMetricSpec {
        name: "avg_memory_usage",
        value: SummaryValue::Decimal { low: 20.0, high: 80.0, decimals: 1 },
        device_count: (5, 50),
    },
    SummaryMetricSpec {
        name: "avg_storage_usage",
        value: SummaryValue::Decimal { low: 30.0, high: 75.0, decimals: 1 },
        device_count: (5, 50),
    },
    SummaryMetricSpec {
        name: "avg_network_in",
        value: SummaryValue::Decimal { low: 10.0, high: 250.0, decimals: 1 },
        device_count: (5, 50),
    },
    SummaryMetricSpec {
        name: "avg_network_out",
        value: SummaryValue::Decimal { low: 5.0, high: 150.0, decimals: 1 },
        device_count: (5, 50),
    },
    SummaryMetricSpec {
        name: "total_active_devices",
        value: SummaryValue::Count { low: 10, high: 100 },
        device_count: (10, 100),
    },
    SummaryMetricSpec {
        name: "total_halted_devices",
        value: SummaryValue::Count { low: 0, high: 10 },
        device_count: (0, 10),
    },
    SummaryMetricSpec {
        name: "total_limited_devices",
        value: SummaryValue::Count { low: 0, high: 15 },
        device_count: (0, 15),
    },
];

pub fn generate_metric_summaries<R: Rng + ?Sized>(rng: &mut R) -> Vec<MetricSummaryRecord> {
    SUMMARY_METRICS
        .iter()
        .map(|spec| {
            let metric_value = match spec.value {
                SummaryValue::Decimal { low, high, decimals } => {
                    uniform_rounded(rng, (low, high), decimals)
                }
                SummaryValue::Count { low, high } => rng.random_range(low..=high) as f64,
            };
            let (low, high) = spec.device_count;
            MetricSummaryRecord {
                metric_name: spec.name.to_string(),
                metric_value,
                device_count: rng.random_range(low..=high),
            }
        })
        .collect()
}
