//! Mode dispatch: fetch, generate, write, report.

use chrono::Utc;
use clap::ValueEnum;
use rand::Rng;
use std::fmt;
use tracing::{error, info, warn};

use super::error::RunError;
use super::generators::{
    DeviceStatAction, generate_metric_summaries, plan_asset_update, plan_device_stat_action,
    seed_device_stats,
};
use super::models::{ASSETS, DEVICE_LOAD_STATS};
use super::rest_client::RestTransport;
use super::store::TelemetryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Mode {
    /// Update assets only
    Assets,
    /// Update device load statistics only (seeds an empty collection)
    Stats,
    /// Update assets, then device load statistics
    #[default]
    Both,
    /// Write the metrics summary feed only
    Summary,
}

impl Mode {
    pub fn includes_assets(&self) -> bool {
        matches!(self, Mode::Assets | Mode::Both)
    }

    pub fn includes_stats(&self) -> bool {
        matches!(self, Mode::Stats | Mode::Both)
    }

    pub fn includes_summary(&self) -> bool {
        matches!(self, Mode::Summary)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Assets => "assets",
            Mode::Stats => "stats",
            Mode::Both => "both",
            Mode::Summary => "summary",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub mode: Mode,
    /// Truncates each fetched collection to its first `limit` rows.
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetRunSummary {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceStatRunSummary {
    pub processed: usize,
    pub updated: usize,
    pub inserted: usize,
    pub seeded: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetricSummaryReport {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub assets: Option<AssetRunSummary>,
    pub device_stats: Option<DeviceStatRunSummary>,
    pub metrics_summary: Option<MetricSummaryReport>,
}

pub struct Runner<T: RestTransport, R: Rng> {
    store: TelemetryStore<T>,
    rng: R,
}

fn truncate<T>(rows: &mut Vec<T>, limit: Option<usize>, label: &str) {
    if let Some(limit) = limit {
        info!(limit, collection = label, "Limiting records to update.");
        rows.truncate(limit);
    }
}

impl<T: RestTransport, R: Rng> Runner<T, R> {
    pub fn new(store: TelemetryStore<T>, rng: R) -> Self {
        Self { store, rng }
    }

    pub fn store(&self) -> &TelemetryStore<T> {
        &self.store
    }

    /// Runs the pipelines selected by `options.mode`, one request at a time.
    /// Per-row write failures are logged and counted; a failed fetch aborts.
    pub async fn run(&mut self, options: RunOptions) -> Result<RunReport, RunError> {
        let mut report = RunReport::default();

        if options.mode.includes_assets() {
            report.assets = Some(self.run_assets(options.limit).await?);
        }
        if options.mode.includes_stats() {
            report.device_stats = Some(self.run_device_stats(options.limit).await?);
        }
        if options.mode.includes_summary() {
            report.metrics_summary = Some(self.run_metrics_summary().await);
        }

        Ok(report)
    }

    pub async fn run_assets(&mut self, limit: Option<usize>) -> Result<AssetRunSummary, RunError> {
        let mut assets = self
            .store
            .fetch_assets()
            .await
            .map_err(|source| RunError::Fetch {
                collection: ASSETS,
                source,
            })?;
        truncate(&mut assets, limit, ASSETS);

        let mut summary = AssetRunSummary::default();
        if assets.is_empty() {
            warn!("No assets found in the database.");
            return Ok(summary);
        }

        info!(count = assets.len(), "Generating random updates for assets...");
        for (row, fetched) in assets.iter().enumerate() {
            summary.processed += 1;
            let asset = match fetched {
                Ok(asset) => asset,
                Err(e) => {
                    summary.failed += 1;
                    error!(row, error = %e, "Skipping asset row that could not be decoded.");
                    continue;
                }
            };
            let Some(updates) = plan_asset_update(asset, &mut self.rng, Utc::now()) else {
                summary.skipped += 1;
                continue;
            };

            match self.store.update_asset(&asset.mac_address, &updates).await {
                Ok(()) => {
                    summary.updated += 1;
                    info!(mac_address = %asset.mac_address, "Successfully updated asset.");
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(mac_address = %asset.mac_address, status = ?e.status_code(), error = %e, "Failed to update asset.");
                }
            }
        }

        info!(
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            "Asset update summary."
        );
        Ok(summary)
    }

    pub async fn run_device_stats(
        &mut self,
        limit: Option<usize>,
    ) -> Result<DeviceStatRunSummary, RunError> {
        let mut stats = self
            .store
            .fetch_device_stats()
            .await
            .map_err(|source| RunError::Fetch {
                collection: DEVICE_LOAD_STATS,
                source,
            })?;
        truncate(&mut stats, limit, DEVICE_LOAD_STATS);

        let mut summary = DeviceStatRunSummary::default();
        if stats.is_empty() {
            warn!("No device load statistics found in the database.");
            self.seed_empty_device_stats(&mut summary).await;
            return Ok(summary);
        }

        info!(count = stats.len(), "Generating random updates for device load statistics...");
        for (row, fetched) in stats.iter().enumerate() {
            summary.processed += 1;
            let stat = match fetched {
                Ok(stat) => stat,
                Err(e) => {
                    summary.failed += 1;
                    error!(row, error = %e, "Skipping device stat row that could not be decoded.");
                    continue;
                }
            };
            match plan_device_stat_action(stat, &mut self.rng, Utc::now()) {
                DeviceStatAction::Update { id, fields } => {
                    match self.store.update_device_stat(id, &fields).await {
                        Ok(()) => {
                            summary.updated += 1;
                            info!(id, status = %fields.collection_status, "Successfully updated device stat.");
                        }
                        Err(e) => {
                            summary.failed += 1;
                            error!(id, status = ?e.status_code(), error = %e, "Failed to update device stat.");
                        }
                    }
                }
                DeviceStatAction::Insert(new_stat) => {
                    match self.store.insert_device_stat(&new_stat).await {
                        Ok(()) => {
                            summary.inserted += 1;
                            info!(device_name = %new_stat.device_name, "Successfully inserted device stat.");
                        }
                        Err(e) => {
                            summary.failed += 1;
                            error!(device_name = %new_stat.device_name, status = ?e.status_code(), error = %e, "Failed to insert device stat.");
                        }
                    }
                }
            }
        }

        info!(
            updated = summary.updated,
            inserted = summary.inserted,
            failed = summary.failed,
            "Device stats update summary."
        );
        Ok(summary)
    }

    async fn seed_empty_device_stats(&mut self, summary: &mut DeviceStatRunSummary) {
        let seeds = seed_device_stats(&mut self.rng, Utc::now());
        info!(count = seeds.len(), "Creating initial stats for default devices.");
        for stat in &seeds {
            match self.store.insert_device_stat(stat).await {
                Ok(()) => {
                    summary.seeded += 1;
                    info!(device_name = %stat.device_name, "Seeded device stat.");
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(device_name = %stat.device_name, status = ?e.status_code(), error = %e, "Failed to seed device stat.");
                }
            }
        }
    }

    pub async fn run_metrics_summary(&mut self) -> MetricSummaryReport {
        info!("Updating device metrics summary...");
        let metrics = generate_metric_summaries(&mut self.rng);
        let mut report = MetricSummaryReport {
            total: metrics.len(),
            ..Default::default()
        };

        for metric in &metrics {
            match self.store.upsert_metric_summary(metric).await {
                Ok(()) => {
                    report.succeeded += 1;
                    info!(metric = %metric.metric_name, value = metric.metric_value, "Successfully inserted/updated metric.");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(metric = %metric.metric_name, status = ?e.status_code(), error = %e, "Failed to insert/update metric.");
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            total = report.total,
            "Metrics summary update finished."
        );
        report
    }
}
