// ── Data refresh loop ──
//
// A background task that polls the appliance on a fixed period, resolves
// client identities and posts each cycle's outcome to the host over an
// mpsc channel. Cycles never overlap: a timer tick that fires while a
// cycle is running is skipped. Every cycle is numbered so the receiver
// can tell a superseded outcome from the current one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use flowscope_api::{ApplianceClient, ConfigResponse, StatsResponse};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::identity::{Identity, IdentityLookup, IdentityResolver};

// ── Source seam ──────────────────────────────────────────────────────

/// Where snapshots come from.
pub trait SnapshotSource: Send + Sync + 'static {
    fn config(&self) -> impl Future<Output = Result<ConfigResponse, flowscope_api::Error>> + Send;

    fn stats(&self) -> impl Future<Output = Result<StatsResponse, flowscope_api::Error>> + Send;
}

impl SnapshotSource for ApplianceClient {
    async fn config(&self) -> Result<ConfigResponse, flowscope_api::Error> {
        ApplianceClient::config(self).await
    }

    async fn stats(&self) -> Result<StatsResponse, flowscope_api::Error> {
        ApplianceClient::stats(self).await
    }
}

// ── Outcomes ─────────────────────────────────────────────────────────

/// Everything one successful cycle fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub config: ConfigResponse,
    pub stats: StatsResponse,
    /// Identity per active source IP.
    pub identities: HashMap<String, Identity>,
}

/// Result of one refresh cycle.
#[derive(Debug)]
pub struct RefreshOutcome {
    /// Strictly increasing per loop, starting at 1.
    pub generation: u64,
    pub result: Result<Snapshot, CoreError>,
}

/// Fetch config and stats together, then resolve every active source.
///
/// Either fetch failing fails the cycle. Identity resolution cannot fail.
pub async fn fetch_snapshot<S, L>(
    source: &S,
    resolver: &IdentityResolver<L>,
) -> Result<Snapshot, CoreError>
where
    S: SnapshotSource,
    L: IdentityLookup,
{
    let (config, stats) = tokio::try_join!(source.config(), source.stats())?;
    let identities = resolver
        .resolve_all(stats.active_sources.iter().map(|s| s.source_ip.as_str()))
        .await;
    Ok(Snapshot {
        config,
        stats,
        identities,
    })
}

// ── Loop handle ──────────────────────────────────────────────────────

/// Handle to the background refresh task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct RefreshLoop {
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    paused: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshLoop {
    /// Start polling. The first cycle runs immediately.
    pub fn spawn<S, L>(
        source: S,
        resolver: Arc<IdentityResolver<L>>,
        period: Duration,
        tx: mpsc::Sender<RefreshOutcome>,
    ) -> Self
    where
        S: SnapshotSource,
        L: IdentityLookup + 'static,
    {
        let cancel = CancellationToken::new();
        let trigger = Arc::new(Notify::new());
        let (paused, paused_rx) = watch::channel(false);

        let task = RefreshTask {
            source,
            resolver,
            period,
            tx,
            trigger: Arc::clone(&trigger),
            paused: paused_rx,
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(task.run());
        info!(period_secs = period.as_secs_f64(), "refresh loop started");

        Self {
            cancel,
            trigger,
            paused,
            handle: Some(handle),
        }
    }

    /// Run a cycle as soon as the current one (if any) finishes.
    ///
    /// Works while paused.
    pub fn refresh_now(&self) {
        self.trigger.notify_one();
    }

    /// Stop or resume timer-driven cycles.
    pub fn set_paused(&self, paused: bool) {
        let was = self.paused.send_replace(paused);
        if was != paused {
            info!(paused, "auto refresh toggled");
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Cancel the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "refresh task ended abnormally");
            }
        }
        info!("refresh loop stopped");
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background task ──────────────────────────────────────────────────

struct RefreshTask<S, L> {
    source: S,
    resolver: Arc<IdentityResolver<L>>,
    period: Duration,
    tx: mpsc::Sender<RefreshOutcome>,
    trigger: Arc<Notify>,
    paused: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl<S, L> RefreshTask<S, L>
where
    S: SnapshotSource,
    L: IdentityLookup + 'static,
{
    async fn run(self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut generation: u64 = 0;

        loop {
            let manual = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = self.trigger.notified() => true,
                _ = interval.tick() => false,
            };
            if !manual && *self.paused.borrow() {
                continue;
            }

            generation += 1;
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = fetch_snapshot(&self.source, &*self.resolver) => result,
            };
            match &result {
                Ok(snapshot) => debug!(
                    generation,
                    load_balancers = snapshot.config.load_balancers.len(),
                    sources = snapshot.stats.active_sources.len(),
                    "refresh complete"
                ),
                Err(e) => warn!(generation, error = %e, "refresh failed"),
            }

            if self.tx.send(RefreshOutcome { generation, result }).await.is_err() {
                debug!("outcome receiver dropped, stopping refresh loop");
                break;
            }
            if manual {
                interval.reset();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use flowscope_api::{LoadBalancerConfig, SourceStats};

    use super::*;
    use crate::identity::NoLookup;

    // ── Helpers ──────────────────────────────────────────────────────

    /// Scripted source: counts calls, can fail stats, can be slow.
    #[derive(Default)]
    struct FakeSource {
        calls: AtomicUsize,
        fail_stats: AtomicBool,
        delay: Duration,
    }

    impl SnapshotSource for Arc<FakeSource> {
        async fn config(&self) -> Result<ConfigResponse, flowscope_api::Error> {
            Ok(ConfigResponse {
                load_balancers: vec![LoadBalancerConfig {
                    address: "10.0.0.1".into(),
                    enabled: true,
                    ..LoadBalancerConfig::default()
                }],
                ..ConfigResponse::default()
            })
        }

        async fn stats(&self) -> Result<StatsResponse, flowscope_api::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_stats.load(Ordering::SeqCst) {
                return Err(flowscope_api::Error::Status {
                    status: 500,
                    endpoint: "/api/stats".into(),
                });
            }
            Ok(StatsResponse {
                active_sources: vec![SourceStats {
                    source_ip: "192.168.1.5".into(),
                    ..SourceStats::default()
                }],
                ..StatsResponse::default()
            })
        }
    }

    fn spawn(
        source: &Arc<FakeSource>,
        period: Duration,
    ) -> (RefreshLoop, mpsc::Receiver<RefreshOutcome>) {
        let (tx, rx) = mpsc::channel(8);
        let resolver = Arc::new(IdentityResolver::new(NoLookup));
        let refresh = RefreshLoop::spawn(Arc::clone(source), resolver, period, tx);
        (refresh, rx)
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn snapshot_includes_identities() {
        let source = Arc::new(FakeSource::default());
        let resolver = IdentityResolver::new(NoLookup);
        let snapshot = fetch_snapshot(&source, &resolver).await.unwrap();
        assert_eq!(snapshot.config.load_balancers.len(), 1);
        assert!(snapshot.identities.contains_key("192.168.1.5"));
    }

    #[tokio::test]
    async fn either_fetch_failing_fails_cycle() {
        let source = Arc::new(FakeSource::default());
        source.fail_stats.store(true, Ordering::SeqCst);
        let resolver = IdentityResolver::new(NoLookup);
        let err = fetch_snapshot(&source, &resolver).await.unwrap_err();
        assert_eq!(
            err,
            CoreError::Status {
                status: 500,
                endpoint: "/api/stats".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_is_immediate_then_periodic() {
        let source = Arc::new(FakeSource::default());
        let (refresh, mut rx) = spawn(&source, Duration::from_secs(5));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.generation, 1);
        assert!(first.result.is_ok());

        let second = rx.recv().await.unwrap();
        assert_eq!(second.generation, 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        refresh.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn generations_strictly_increase_across_failures() {
        let source = Arc::new(FakeSource::default());
        let (refresh, mut rx) = spawn(&source, Duration::from_secs(1));

        let ok = rx.recv().await.unwrap();
        source.fail_stats.store(true, Ordering::SeqCst);
        let failed = rx.recv().await.unwrap();

        assert!(ok.result.is_ok());
        assert!(failed.result.is_err());
        assert!(failed.generation > ok.generation);

        refresh.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_never_overlap() {
        let source = Arc::new(FakeSource {
            delay: Duration::from_secs(12),
            ..FakeSource::default()
        });
        let started = tokio::time::Instant::now();
        let (refresh, mut rx) = spawn(&source, Duration::from_secs(5));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.generation, second.generation), (1, 2));
        // The second cycle only started once the first one finished.
        assert!(started.elapsed() >= Duration::from_secs(24));

        refresh.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn paused_loop_only_runs_on_demand() {
        let source = Arc::new(FakeSource::default());
        let (refresh, mut rx) = spawn(&source, Duration::from_secs(5));
        let _initial = rx.recv().await.unwrap();

        refresh.set_paused(true);
        assert!(refresh.is_paused());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.try_recv().is_err());

        refresh.refresh_now();
        let manual = rx.recv().await.unwrap();
        assert_eq!(manual.generation, 2);

        refresh.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_outcomes() {
        let source = Arc::new(FakeSource::default());
        let (refresh, mut rx) = spawn(&source, Duration::from_secs(5));
        let _initial = rx.recv().await.unwrap();

        refresh.shutdown().await;
        assert!(rx.recv().await.is_none());
    }
}
