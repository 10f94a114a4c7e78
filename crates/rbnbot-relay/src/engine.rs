use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use rbnbot_core::config::RelayConfig;
use rbnbot_core::{MessageHandle, PublishedMessage, RichMessage};
use rbnbot_feed::{parse_line, SourceSupervisor};

use crate::continent::ContinentResolver;
use crate::registry::{EvictionReport, MessageRegistry};
use crate::sink::MessageSink;
use crate::stats::RelayStats;
use crate::window::{FlushOutcome, SpotAggregator};

/// Zero-width space: Discord rejects embed fields with an empty name.
const FIELD_NAME: &str = "\u{200b}";

/// Drives the four periodic activities of the relay over shared state:
///
/// | Loop    | Cadence                 | Touches                          |
/// |---------|-------------------------|----------------------------------|
/// | ingest  | `ingest_interval_ms`    | feed queue → window (append)     |
/// | publish | `publish_interval_secs` | window (take) → sink → registry  |
/// | evict   | `evict_interval_secs`   | registry (pop head) → sink       |
/// | legend  | `legend_interval_secs`  | sink → registry (append)         |
pub struct RelayEngine<S: MessageSink + 'static> {
    sink: Arc<S>,
    config: Arc<RelayConfig>,
    ttl: TimeDelta,
    aggregator: Arc<SpotAggregator>,
    registry: Arc<MessageRegistry>,
    resolver: Arc<dyn ContinentResolver>,
    stats: Arc<RelayStats>,
}

impl<S: MessageSink + 'static> Clone for RelayEngine<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            config: Arc::clone(&self.config),
            ttl: self.ttl,
            aggregator: Arc::clone(&self.aggregator),
            registry: Arc::clone(&self.registry),
            resolver: Arc::clone(&self.resolver),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<S: MessageSink + 'static> RelayEngine<S> {
    pub fn new(config: &RelayConfig, sink: Arc<S>, resolver: Arc<dyn ContinentResolver>) -> Self {
        Self {
            sink,
            ttl: TimeDelta::from_std(config.message_ttl()).unwrap_or(TimeDelta::MAX),
            aggregator: Arc::new(SpotAggregator::from_config(config)),
            config: Arc::new(config.clone()),
            registry: Arc::new(MessageRegistry::new()),
            resolver,
            stats: Arc::new(RelayStats::default()),
        }
    }

    /// Window shared with other producers (e.g. chat commands).
    pub fn aggregator(&self) -> Arc<SpotAggregator> {
        Arc::clone(&self.aggregator)
    }

    pub fn registry(&self) -> Arc<MessageRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Keep the feed alive and move queued lines into the window.
    ///
    /// At most `ingest_batch_limit` lines are drained per call. Returns the
    /// number of spots accepted.
    pub fn ingest_tick(&self, supervisor: &mut SourceSupervisor) -> usize {
        if let Err(e) = supervisor.ensure_running() {
            RelayStats::incr(&self.stats.respawn_failures);
            warn!(error = %e, "feed respawn failed, retrying next tick");
        }

        let mut accepted = 0;
        for _ in 0..self.config.ingest_batch_limit {
            let Some(line) = supervisor.poll_line() else {
                break;
            };
            if self.ingest_line(&line) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Parse one feed line, resolve its icon and append it to the window.
    /// Malformed lines are counted and dropped.
    pub fn ingest_line(&self, line: &str) -> bool {
        RelayStats::incr(&self.stats.lines_received);
        match parse_line(line) {
            Ok(event) => {
                let icon = self.resolver.icon(&event.spotter);
                self.aggregator.accept(&event.with_icon(icon));
                true
            }
            Err(e) => {
                RelayStats::incr(&self.stats.parse_failures);
                debug!(line = %line.trim_end(), error = %e, "dropping malformed feed line");
                false
            }
        }
    }

    /// Flush the window and publish it as one rich message.
    ///
    /// Empty windows publish nothing; oversized ones are dropped. A failed
    /// send loses the batch and registers nothing.
    pub async fn publish_tick(&self, now: DateTime<Utc>) -> Option<MessageHandle> {
        let batch = match self.aggregator.flush() {
            FlushOutcome::Empty => return None,
            FlushOutcome::Oversized { chars, limit } => {
                RelayStats::incr(&self.stats.batches_oversized);
                warn!(chars, limit, "spot batch exceeds size limit, dropped");
                return None;
            }
            FlushOutcome::Ready(batch) => batch,
        };

        let message = RichMessage {
            title: format!("📡 **{}**", now.with_timezone(&Local).format("%H:%M:%S")),
            color: self.config.accent_color,
            field_name: FIELD_NAME.to_string(),
            field_value: batch.text,
        };

        match self.sink.send_rich(&message).await {
            Ok(handle) => {
                self.registry.register(PublishedMessage::new(handle, now));
                RelayStats::incr(&self.stats.batches_published);
                info!(
                    %handle,
                    spots = batch.fragments,
                    chars = batch.chars,
                    "spot batch published"
                );
                Some(handle)
            }
            Err(e) => {
                RelayStats::incr(&self.stats.send_failures);
                warn!(error = %e, spots = batch.fragments, "spot batch send failed, dropped");
                None
            }
        }
    }

    /// Post the legend notice and register it for expiry like any batch.
    pub async fn legend_tick(&self, now: DateTime<Utc>) -> Option<MessageHandle> {
        match self.sink.send_text(&self.config.legend).await {
            Ok(handle) => {
                self.registry.register(PublishedMessage::new(handle, now));
                RelayStats::incr(&self.stats.legends_published);
                debug!(%handle, "legend published");
                Some(handle)
            }
            Err(e) => {
                RelayStats::incr(&self.stats.send_failures);
                warn!(error = %e, "legend send failed");
                None
            }
        }
    }

    /// Delete every registered message older than the TTL.
    pub async fn evict_tick(&self, now: DateTime<Utc>) -> EvictionReport {
        let report = self
            .registry
            .evict_expired(now, self.ttl, self.sink.as_ref())
            .await;
        RelayStats::add(&self.stats.messages_evicted, report.evicted as u64);
        RelayStats::add(&self.stats.delete_failures, report.failed as u64);
        if report.evicted > 0 {
            debug!(
                evicted = report.evicted,
                failed = report.failed,
                remaining = self.registry.len(),
                "expired messages evicted"
            );
        }
        report
    }

    /// Spawn all four loops. Each stops after its current tick once `shutdown`
    /// broadcasts `true`; the ingest loop then kills the feed process.
    pub fn spawn(
        self,
        supervisor: SourceSupervisor,
        shutdown: watch::Receiver<bool>,
    ) -> RelayTasks {
        let handles = vec![
            tokio::spawn(self.clone().run_ingest(supervisor, shutdown.clone())),
            tokio::spawn(self.clone().run_publish(shutdown.clone())),
            tokio::spawn(self.clone().run_evict(shutdown.clone())),
            tokio::spawn(self.run_legend(shutdown)),
        ];
        RelayTasks { handles }
    }

    async fn run_ingest(
        self,
        mut supervisor: SourceSupervisor,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("ingest loop started");
        let mut interval = ticker(self.config.ingest_interval());
        while next_tick(&mut interval, &mut shutdown).await {
            self.ingest_tick(&mut supervisor);
        }
        supervisor.shutdown();
        info!(dropped = supervisor.dropped_lines(), "ingest loop stopped");
    }

    async fn run_publish(self, mut shutdown: watch::Receiver<bool>) {
        info!("publish loop started");
        let mut interval = ticker(self.config.publish_interval());
        while next_tick(&mut interval, &mut shutdown).await {
            self.publish_tick(Utc::now()).await;
        }
        info!("publish loop stopped");
    }

    async fn run_evict(self, mut shutdown: watch::Receiver<bool>) {
        info!("eviction loop started");
        let mut interval = ticker(self.config.evict_interval());
        while next_tick(&mut interval, &mut shutdown).await {
            self.evict_tick(Utc::now()).await;
        }
        info!(pending = self.registry.len(), "eviction loop stopped");
    }

    async fn run_legend(self, mut shutdown: watch::Receiver<bool>) {
        info!("legend loop started");
        let mut interval = ticker(self.config.legend_interval());
        while next_tick(&mut interval, &mut shutdown).await {
            self.legend_tick(Utc::now()).await;
        }
        info!("legend loop stopped");
    }
}

/// Join handles of the running relay loops.
pub struct RelayTasks {
    handles: Vec<JoinHandle<()>>,
}

impl RelayTasks {
    /// Wait for every loop to finish.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("relay loop panicked: {e}");
            }
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Wait for the next tick. Returns `false` once shutdown is signalled or the
/// shutdown sender is gone.
async fn next_tick(interval: &mut Interval, shutdown: &mut watch::Receiver<bool>) -> bool {
    loop {
        if *shutdown.borrow() {
            return false;
        }
        tokio::select! {
            _ = interval.tick() => return true,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
}
