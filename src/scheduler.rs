//! Daily backup cycle on a fixed wall-clock schedule.
//!
//! One cycle is snapshot, then best-effort remote upload, then retention
//! pruning. The stages are independently failable and joined only by
//! logging; a failed upload never blocks pruning and a failed cycle never
//! stops the schedule. After every cycle the next fire time is recomputed
//! and a single cancellable sleep is armed, so cycles cannot overlap.

use crate::record::BackupRecord;
use crate::vault::Vault;
use chrono::{DateTime, Duration as ChronoDuration, Local, LocalResult, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Scheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the background task: one cycle immediately, then one per day
    /// at the configured hour.
    pub fn start(vault: Arc<Vault>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let hour = vault.config().schedule_hour;

        let handle = tokio::spawn(async move {
            run_cycle(&vault).await;
            loop {
                let next = next_fire_time(Local::now(), hour);
                let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
                tracing::info!(next = %next.format("%Y-%m-%d %H:%M:%S"), "Next backup cycle armed");
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {
                        run_cycle(&vault).await;
                    }
                }
            }
            tracing::info!("Backup scheduler stopped");
        });

        Self { cancel, handle }
    }

    /// Cancel the pending timer. Idempotent; a cycle already in progress
    /// runs to completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

/// First instant at `hour:00:00` local strictly after `after`.
pub fn next_fire_time<Tz: TimeZone>(after: DateTime<Tz>, hour: u32) -> DateTime<Tz> {
    let hour = hour.min(23);
    let mut date = after.date_naive();
    if date.and_hms_opt(hour, 0, 0).expect("hour in range") <= after.naive_local() {
        date = date.succ_opt().expect("date in range");
    }
    let candidate = date.and_hms_opt(hour, 0, 0).expect("hour in range");
    match after.timezone().from_local_datetime(&candidate) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // DST gap: the hour does not exist that day, fire an hour later.
        LocalResult::None => after
            .timezone()
            .from_local_datetime(&(candidate + ChronoDuration::hours(1)))
            .earliest()
            .unwrap_or_else(|| after + ChronoDuration::days(1)),
    }
}

/// Run one snapshot → upload → prune cycle. Every stage failure is caught
/// and logged here; nothing escapes to the scheduler loop.
pub async fn run_cycle(vault: &Arc<Vault>) -> Option<BackupRecord> {
    tracing::info!("Backup cycle starting");

    let v = vault.clone();
    let mut snapshot = match tokio::task::spawn_blocking(move || v.create_snapshot()).await {
        Ok(Ok(rec)) => Some(rec),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Scheduled snapshot failed");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Snapshot task panicked");
            None
        }
    };

    if let Some(rec) = snapshot.as_mut() {
        match vault.upload_remote(&rec.path, &rec.filename).await {
            Some(id) => {
                tracing::info!(file = %rec.filename, remote_id = %id, "Snapshot replicated");
                rec.remote_id = Some(id);
            }
            None => tracing::warn!(file = %rec.filename, "Snapshot not replicated"),
        }
    }

    let v = vault.clone();
    let days = vault.config().retention_days;
    match tokio::task::spawn_blocking(move || v.prune_older_than(days)).await {
        Ok(Ok(0)) => {}
        Ok(Ok(n)) => tracing::info!(pruned = n, "Expired snapshots pruned"),
        Ok(Err(e)) => tracing::error!(error = %e, "Retention pruning failed"),
        Err(e) => tracing::error!(error = %e, "Retention task panicked"),
    }

    tracing::info!("Backup cycle finished");
    snapshot
}
