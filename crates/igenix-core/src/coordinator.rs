// ── Device session coordinator ──
//
// Sits between any number of concurrent property callers and the single
// device link. Handles location caching, read coalescing, write
// serialization, and recovery after a failed write.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use igenix_api::{DeviceIdentity, DeviceLink, DpsKey, Location, PropertyValue, Snapshot, WriteAck};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{WriteEnvelope, WriteRequest};
use crate::config::DeviceConfig;
use crate::error::{CoreError, LinkOperation};
use crate::flight::Flight;

// ── ResolutionState ──────────────────────────────────────────────

/// Whether the coordinator knows where the device is, observable by consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResolutionState {
    #[default]
    Unresolved,
    Resolving,
    Resolved(Location),
}

impl ResolutionState {
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Resolved(location) => Some(location),
            _ => None,
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for property access.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. All clones share one
/// cached location, one in-flight resolution, one in-flight snapshot
/// fetch, and one write queue.
///
/// A failed write poisons the cached location so the next operation
/// rediscovers the device. A failed read leaves it alone.
pub struct Coordinator<L: DeviceLink> {
    inner: Arc<CoordinatorInner<L>>,
}

impl<L: DeviceLink> Clone for Coordinator<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<L: DeviceLink> {
    session: Arc<Session<L>>,
    write_tx: mpsc::UnboundedSender<WriteEnvelope>,
    /// Taken by the first write, which spawns the queue runner.
    write_rx: Mutex<Option<mpsc::UnboundedReceiver<WriteEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// State shared with the detached resolution, fetch, and write tasks.
struct Session<L: DeviceLink> {
    config: DeviceConfig,
    link: L,
    resolution: watch::Sender<ResolutionState>,
    resolving: Flight<Location>,
    fetching: Flight<Arc<Snapshot>>,
}

impl<L: DeviceLink> Coordinator<L> {
    /// Create a coordinator for one device. Does no network I/O; the
    /// device is located on first demand.
    pub fn new(config: DeviceConfig, link: L) -> Self {
        let (resolution, _) = watch::channel(ResolutionState::Unresolved);
        let (write_tx, write_rx) = mpsc::unbounded_channel();

        let session = Arc::new(Session {
            config,
            link,
            resolution,
            resolving: Flight::new("resolve"),
            fetching: Flight::new("snapshot"),
        });

        Self {
            inner: Arc::new(CoordinatorInner {
                session,
                write_tx,
                write_rx: Mutex::new(Some(write_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.inner.session.config
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.inner.session.config.identity
    }

    /// Access the underlying device link.
    pub fn link(&self) -> &L {
        &self.inner.session.link
    }

    // ── Location ─────────────────────────────────────────────────

    /// Return the device's location, resolving it if needed.
    ///
    /// Returns immediately when cached. Otherwise every concurrent caller
    /// shares a single resolution round trip and receives its location
    /// or its error. After a failure the next call retries.
    pub async fn acquire_handle(&self) -> Result<Location, CoreError> {
        self.inner.session.acquire_handle().await
    }

    /// Forget the cached location so the next operation rediscovers the device.
    ///
    /// Failed writes do this automatically. Has no effect while a
    /// resolution is already running.
    pub fn invalidate(&self) {
        self.inner.session.invalidate();
    }

    /// Subscribe to resolution state changes.
    pub fn resolution_state(&self) -> watch::Receiver<ResolutionState> {
        self.inner.session.resolution.subscribe()
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.session.cached_location().is_some()
    }

    /// `true` while a snapshot fetch is running.
    pub async fn is_fetching(&self) -> bool {
        self.inner.session.fetching.is_active().await
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Fetch the device's full property state.
    ///
    /// Joins the fetch already in flight if there is one. Snapshots are
    /// never cached: every call that does not overlap another one costs
    /// a fresh round trip.
    pub async fn read_snapshot(&self) -> Result<Arc<Snapshot>, CoreError> {
        self.inner.session.read_snapshot().await
    }

    /// Read a single data point from a fresh (or joined) snapshot.
    pub async fn get_property(&self, key: DpsKey) -> Result<PropertyValue, CoreError> {
        let snapshot = self.read_snapshot().await?;
        lookup(&snapshot, key)
    }

    /// Read several data points from one snapshot, in `keys` order.
    ///
    /// All or nothing: a missing key fails the whole call.
    pub async fn get_properties(&self, keys: &[DpsKey]) -> Result<Vec<PropertyValue>, CoreError> {
        let snapshot = self.read_snapshot().await?;
        keys.iter().map(|&key| lookup(&snapshot, key)).collect()
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Queue a single data point write and return a future for its outcome.
    ///
    /// The write is queued when this method is called, not when the
    /// future is first polled, so writes reach the device strictly one at
    /// a time in call order. Redundant writes are not merged. A failure
    /// is reported only to this caller, poisons the cached location, and
    /// does not disturb the writes queued behind it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set_property<V: Into<PropertyValue>>(
        &self,
        key: DpsKey,
        value: V,
    ) -> impl Future<Output = Result<WriteAck, CoreError>> + Send + use<L, V> {
        let queued = self.enqueue(WriteRequest {
            key,
            value: value.into(),
        });
        async move {
            let rx = queued?;
            rx.await.map_err(|_| CoreError::CoordinatorClosed)?
        }
    }

    fn enqueue(
        &self,
        request: WriteRequest,
    ) -> Result<oneshot::Receiver<Result<WriteAck, CoreError>>, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::CoordinatorClosed);
        }
        self.ensure_write_queue();

        debug!(key = %request.key, value = %request.value, "queueing property write");

        let (response_tx, response_rx) = oneshot::channel();
        self.inner
            .write_tx
            .send(WriteEnvelope {
                request,
                response_tx,
            })
            .map_err(|_| CoreError::CoordinatorClosed)?;
        Ok(response_rx)
    }

    fn ensure_write_queue(&self) {
        let Some(rx) = self
            .inner
            .write_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        let session = Arc::clone(&self.inner.session);
        let cancel = self.inner.cancel.clone();
        let handle = tokio::spawn(write_queue_task(session, rx, cancel));
        self.inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Stop the write queue.
    ///
    /// A write already on the wire finishes; writes still queued, and any
    /// issued afterwards, fail with [`CoreError::CoordinatorClosed`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handles: Vec<_> = self
            .inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
        debug!(device = %self.identity().name, "coordinator shut down");
    }
}

// ── Session ──────────────────────────────────────────────────────

impl<L: DeviceLink> Session<L> {
    fn cached_location(&self) -> Option<Location> {
        self.resolution.borrow().location().cloned()
    }

    async fn acquire_handle(self: &Arc<Self>) -> Result<Location, CoreError> {
        if let Some(location) = self.cached_location() {
            return Ok(location);
        }
        let session = Arc::clone(self);
        let publisher = Arc::clone(self);
        self.resolving
            .join_and_publish(
                move || session.resolve(),
                move |result| publisher.publish_resolution(result),
            )
            .await
    }

    /// Record a resolution outcome. Runs as the resolve flight lands, so a
    /// caller that finds the cache empty afterwards starts a fresh round
    /// trip instead of joining one whose location may already be poisoned.
    fn publish_resolution(&self, result: &Result<Location, CoreError>) {
        self.resolution.send_if_modified(|state| {
            // Only a round trip this flight started owns the state.
            if *state != ResolutionState::Resolving {
                return false;
            }
            *state = match result {
                Ok(location) => ResolutionState::Resolved(location.clone()),
                Err(_) => ResolutionState::Unresolved,
            };
            true
        });
    }

    async fn resolve(self: Arc<Self>) -> Result<Location, CoreError> {
        // A resolution may have landed between our cache check and
        // taking the flight slot.
        if let Some(location) = self.cached_location() {
            return Ok(location);
        }

        let device = self.config.identity.name.clone();
        debug!(device = %device, "resolving device location");
        self.resolution.send_replace(ResolutionState::Resolving);

        let result = bounded(
            self.config.resolve_timeout,
            LinkOperation::Resolve,
            self.link.resolve_location(),
            |source| CoreError::ResolutionFailed {
                device: device.clone(),
                source,
            },
        )
        .await;

        match &result {
            Ok(location) => info!(device = %device, location = %location, "device located"),
            Err(e) => warn!(device = %device, error = %e, "device location failed"),
        }
        result
    }

    fn invalidate(&self) {
        let poisoned = self.resolution.send_if_modified(|state| {
            if matches!(state, ResolutionState::Resolved(_)) {
                *state = ResolutionState::Unresolved;
                true
            } else {
                false
            }
        });
        if poisoned {
            warn!(device = %self.config.identity.name, "cached device location invalidated");
        }
    }

    async fn read_snapshot(self: &Arc<Self>) -> Result<Arc<Snapshot>, CoreError> {
        let session = Arc::clone(self);
        self.fetching.join(move || session.fetch_snapshot()).await
    }

    async fn fetch_snapshot(self: Arc<Self>) -> Result<Arc<Snapshot>, CoreError> {
        let location = self.acquire_handle().await?;
        debug!(location = %location, "fetching property snapshot");

        let snapshot = bounded(
            self.config.request_timeout,
            LinkOperation::Fetch,
            self.link.fetch_snapshot(&location),
            |source| CoreError::SnapshotFailed { source },
        )
        .await
        // Read failures never touch the cached location.
        .inspect_err(|e| warn!(error = %e, "snapshot fetch failed"))?;

        debug!(properties = snapshot.len(), "snapshot fetched");
        Ok(Arc::new(snapshot))
    }

    async fn write(self: &Arc<Self>, request: WriteRequest) -> Result<WriteAck, CoreError> {
        let WriteRequest { key, value } = request;

        let result = async {
            let location = self.acquire_handle().await?;
            debug!(key = %key, value = %value, location = %location, "writing property");
            bounded(
                self.config.request_timeout,
                LinkOperation::Write,
                self.link.write_value(&location, key, value),
                |source| CoreError::WriteFailed { key, source },
            )
            .await
        }
        .await;

        match &result {
            Ok(_) => debug!(key = %key, "property written"),
            Err(e) => {
                warn!(key = %key, error = %e, "property write failed");
                self.invalidate();
            }
        }
        result
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Run queued writes one at a time, in arrival order.
async fn write_queue_task<L: DeviceLink>(
    session: Arc<Session<L>>,
    mut rx: mpsc::UnboundedReceiver<WriteEnvelope>,
    cancel: CancellationToken,
) {
    info!(device = %session.config.identity.name, "write queue started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = run_write(&session, envelope.request).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }

    rx.close();
    let mut dropped = 0usize;
    while let Ok(envelope) = rx.try_recv() {
        let _ = envelope.response_tx.send(Err(CoreError::CoordinatorClosed));
        dropped += 1;
    }

    info!(
        device = %session.config.identity.name,
        dropped,
        "write queue stopped"
    );
}

/// A panicking link counts as a failed write; the queue keeps running.
async fn run_write<L: DeviceLink>(
    session: &Arc<Session<L>>,
    request: WriteRequest,
) -> Result<WriteAck, CoreError> {
    let key = request.key;
    match AssertUnwindSafe(session.write(request)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            warn!(key = %key, "property write panicked");
            session.invalidate();
            Err(CoreError::Internal(format!("write of data point {key} panicked")))
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Await a link round trip, bounded by `limit` unless it is zero.
async fn bounded<T, F>(
    limit: Duration,
    operation: LinkOperation,
    request: F,
    wrap: impl FnOnce(Arc<igenix_api::Error>) -> CoreError,
) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, igenix_api::Error>>,
{
    let outcome = if limit.is_zero() {
        request.await
    } else {
        tokio::time::timeout(limit, request)
            .await
            .map_err(|_| CoreError::Timeout {
                operation,
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })?
    };
    outcome.map_err(|e| wrap(Arc::new(e)))
}

fn lookup(snapshot: &Snapshot, key: DpsKey) -> Result<PropertyValue, CoreError> {
    snapshot
        .get(key)
        .cloned()
        .ok_or(CoreError::PropertyMissing { key })
}
