//! Exporter — one remote-write cycle, and the periodic loop around it.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use metricgate_aggregator::CatalogueHandle;
use metricgate_core::config::ExportConfig;

use crate::client::RemoteWriteClient;
use crate::error::{ExportError, ExportResult};
use crate::payload::{build_write_request, encode, validate};

/// What one cycle sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExportReport {
    pub series: usize,
    /// Compressed body size.
    pub bytes: usize,
}

pub struct Exporter {
    catalogue: CatalogueHandle,
    client: RemoteWriteClient,
    external_labels: BTreeMap<String, String>,
}

impl Exporter {
    pub fn new(
        catalogue: CatalogueHandle,
        client: RemoteWriteClient,
        external_labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            catalogue,
            client,
            external_labels,
        }
    }

    /// Build an exporter from config. Returns `None` when no URL is set.
    pub fn from_config(
        config: &ExportConfig,
        catalogue: CatalogueHandle,
    ) -> ExportResult<Option<Self>> {
        let url = match config.url.as_deref() {
            Some(url) if config.enabled() => url,
            _ => return Ok(None),
        };
        let client = RemoteWriteClient::new(url, config.username.clone(), config.password.clone())?;
        Ok(Some(Self::new(
            catalogue,
            client,
            config.external_labels.clone(),
        )))
    }

    /// Snapshot the catalogue and push it. An empty catalogue sends nothing.
    pub async fn export(&self) -> ExportResult<ExportReport> {
        let catalogue = self.catalogue.snapshot().await?;
        let request = build_write_request(&catalogue, &self.external_labels, now_millis());
        if request.timeseries.is_empty() {
            debug!("nothing to export");
            return Ok(ExportReport::default());
        }

        validate(&request)?;
        let body = encode(&request)?;
        let report = ExportReport {
            series: request.timeseries.len(),
            bytes: body.len(),
        };
        self.client.send(body).await?;

        info!(
            url = %self.client.url(),
            series = report.series,
            bytes = report.bytes,
            "remote write complete"
        );
        Ok(report)
    }

    /// Export every `interval` until shutdown, then once more.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            url = %self.client.url(),
            "exporter started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.export().await {
                        log_failure(&e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("exporter shutting down");
                    // Final export before exit.
                    if let Err(e) = self.export().await {
                        log_failure(&e);
                    }
                    break;
                }
            }
        }
    }
}

/// Transport failures warn; everything else is an error.
fn log_failure(e: &ExportError) {
    match e {
        ExportError::Transport(_) | ExportError::Status { .. } => {
            warn!(error = %e, "remote write failed")
        }
        _ => error!(error = %e, "remote write failed"),
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
