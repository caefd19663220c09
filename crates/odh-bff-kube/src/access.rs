//! Namespace fan-out: which namespaces may this caller `get`?
//!
//! A single producer feeds namespace names into a bounded jobs channel. A
//! fixed pool of workers runs one access review per name and publishes the
//! outcome into a bounded results channel that the collector drains. The
//! collector stops early on cancellation or when the deadline passes and
//! returns whatever it accumulated.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use odh_bff_core::constants::{NAMESPACE_LIST_TIMEOUT, NAMESPACE_WORKERS};
use odh_bff_core::RequestIdentity;

use crate::client::{AccessCheck, KubernetesClient};
use crate::error::KubeError;

/// Namespaces visible to one caller.
///
/// Order follows collection order and is not stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceAccessResult {
    pub namespaces: Vec<String>,
    /// Set when collection stopped early; `namespaces` is then partial.
    pub interrupted: Option<KubeError>,
}

impl NamespaceAccessResult {
    pub fn is_partial(&self) -> bool {
        self.interrupted.is_some()
    }
}

struct NamespaceCheck {
    namespace: String,
    outcome: Result<bool, KubeError>,
}

#[derive(Debug, Clone, Copy)]
pub struct NamespaceAccessor {
    workers: usize,
    deadline: Duration,
    /// Try the cluster-admin fast path before fanning out.
    admin_fast_path: bool,
}

impl Default for NamespaceAccessor {
    fn default() -> Self {
        Self {
            workers: NAMESPACE_WORKERS,
            deadline: NAMESPACE_LIST_TIMEOUT,
            admin_fast_path: true,
        }
    }
}

impl NamespaceAccessor {
    pub fn new(workers: usize, deadline: Duration) -> Self {
        Self {
            workers: workers.max(1),
            deadline,
            ..Default::default()
        }
    }

    pub fn with_admin_fast_path(mut self, enabled: bool) -> Self {
        self.admin_fast_path = enabled;
        self
    }

    /// List the namespaces `identity` may `get`.
    ///
    /// Listing failures are returned as errors. Per-namespace review failures
    /// are logged and the namespace is left out. Cancellation and deadline
    /// expiry during collection produce a partial result.
    pub async fn accessible_namespaces(
        &self,
        client: Arc<dyn KubernetesClient>,
        identity: &RequestIdentity,
        cancel: &CancellationToken,
    ) -> Result<NamespaceAccessResult, KubeError> {
        let deadline = Instant::now() + self.deadline;

        if self.admin_fast_path {
            match bounded(cancel, deadline, client.is_cluster_admin(identity)).await? {
                Ok(true) => {
                    debug!("caller is cluster-admin, skipping per-namespace reviews");
                    let namespaces =
                        bounded(cancel, deadline, client.list_namespace_names(identity)).await??;
                    return Ok(NamespaceAccessResult {
                        namespaces: dedup(namespaces),
                        interrupted: None,
                    });
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, "cluster-admin check failed, reviewing each namespace"),
            }
        }

        let all = bounded(cancel, deadline, client.list_namespace_names(identity)).await??;
        let all = dedup(all);
        let total = all.len();
        if total == 0 {
            return Ok(NamespaceAccessResult::default());
        }

        // Stops the producer and workers once collection ends.
        let stop = cancel.child_token();
        let (jobs_tx, jobs_rx) = mpsc::channel::<String>(total);
        let (results_tx, mut results_rx) = mpsc::channel::<NamespaceCheck>(total);
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        let identity = Arc::new(identity.clone());

        let mut tasks = JoinSet::new();
        tasks.spawn(produce(all, jobs_tx, stop.clone()));
        for _ in 0..self.workers.min(total) {
            tasks.spawn(review_worker(
                client.clone(),
                identity.clone(),
                jobs_rx.clone(),
                results_tx.clone(),
                stop.clone(),
            ));
        }
        drop(results_tx);

        let mut seen = HashSet::with_capacity(total);
        let mut namespaces = Vec::new();
        let mut failed = 0usize;
        let mut received = 0usize;
        let mut interrupted = None;

        while received < total {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    interrupted = Some(KubeError::Cancelled);
                    break;
                }
                _ = tokio::time::sleep_until(deadline) => {
                    interrupted = Some(KubeError::Timeout("namespace access review".to_string()));
                    break;
                }
                check = results_rx.recv() => {
                    let Some(check) = check else { break };
                    received += 1;
                    match check.outcome {
                        Ok(true) => {
                            if seen.insert(check.namespace.clone()) {
                                namespaces.push(check.namespace);
                            }
                        }
                        Ok(false) => {}
                        Err(e) => {
                            failed += 1;
                            warn!(namespace = %check.namespace, error = %e, "namespace access review failed");
                        }
                    }
                }
            }
        }

        stop.cancel();
        results_rx.close();
        tasks.abort_all();

        if failed > 0 {
            warn!(failed, total, "namespaces omitted after access review errors");
        }
        if let Some(reason) = &interrupted {
            info!(collected = received, total, reason = %reason, "namespace fan-out interrupted");
        } else {
            debug!(allowed = namespaces.len(), total, "namespace fan-out complete");
        }

        Ok(NamespaceAccessResult {
            namespaces,
            interrupted,
        })
    }
}

/// Run `fut` unless the caller cancels or the deadline passes first.
async fn bounded<T>(
    cancel: &CancellationToken,
    deadline: Instant,
    fut: impl std::future::Future<Output = T>,
) -> Result<T, KubeError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(KubeError::Cancelled),
        res = tokio::time::timeout_at(deadline, fut) => {
            res.map_err(|_| KubeError::Timeout("namespace listing".to_string()))
        }
    }
}

async fn produce(names: Vec<String>, jobs: mpsc::Sender<String>, stop: CancellationToken) {
    for name in names {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            sent = jobs.send(name) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    // Dropping the sender closes the jobs channel.
}

async fn review_worker(
    client: Arc<dyn KubernetesClient>,
    identity: Arc<RequestIdentity>,
    jobs: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::Sender<NamespaceCheck>,
    stop: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = stop.cancelled() => return,
            next = async { jobs.lock().await.recv().await } => next,
        };
        let Some(namespace) = next else { return };

        let check = AccessCheck::get_namespace(&namespace);
        let outcome = tokio::select! {
            biased;
            _ = stop.cancelled() => return,
            outcome = client.review_access(&identity, &check) => outcome,
        };
        if results.send(NamespaceCheck { namespace, outcome }).await.is_err() {
            return;
        }
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names.into_iter().filter(|n| seen.insert(n.clone())).collect()
}
