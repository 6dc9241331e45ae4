//! Session pool
//!
//! Holds at most one session per registered backend. Each backend has a
//! [`Slot`] whose state is one of:
//!
//! - `Empty`: nothing open; the next acquire starts an open
//! - `Opening`: an open task is running; acquirers wait on its shared result
//! - `Idle`: a ready session waiting to be lent out
//! - `Leased`: a [`SessionHandle`] holds the session
//!
//! Opens are spawned so they finish even if every acquirer gives up, and
//! all concurrent acquirers share one attempt. Slot locks are plain mutexes
//! and are never held across an `.await`.

mod connector;
mod handle;
mod health_check;

pub use connector::{Connector, TcpConnector};
pub use handle::SessionHandle;
pub use health_check::{IdleVerdict, check_idle_session};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::backend::BackendDescriptor;
use crate::config::PoolConfig;
use crate::connection_error::ConnectionError;
use crate::error::ProxyError;
use crate::session::Session;
use crate::types::BackendName;

type OpenFuture = Shared<BoxFuture<'static, Result<(), ConnectionError>>>;

/// Health of a backend as seen by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendRuntimeState {
    /// A usable session exists (idle or lent out)
    Online,
    /// No session and no recorded failure
    Offline,
    /// No usable session and the last open or exchange failed
    Degraded,
}

impl std::fmt::Display for BackendRuntimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Degraded => "degraded",
        })
    }
}

/// Open counters for one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub state: BackendRuntimeState,
    pub opens_attempted: u64,
    pub opens_failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

enum SlotState {
    Empty,
    Opening(OpenFuture),
    Idle(Session),
    Leased,
}

struct SlotInner {
    state: SlotState,
    last_error: Option<ConnectionError>,
    removed: bool,
}

pub(crate) struct Slot {
    descriptor: Arc<BackendDescriptor>,
    inner: Mutex<SlotInner>,
    available: Notify,
    opens_attempted: AtomicU64,
    opens_failed: AtomicU64,
}

impl Slot {
    fn new(descriptor: Arc<BackendDescriptor>) -> Self {
        Self {
            descriptor,
            inner: Mutex::new(SlotInner {
                state: SlotState::Empty,
                last_error: None,
                removed: false,
            }),
            available: Notify::new(),
            opens_attempted: AtomicU64::new(0),
            opens_failed: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a leased session
    fn check_in(&self, session: Session) {
        if !session.is_ready() {
            self.discard(session, None);
            return;
        }
        {
            let mut inner = self.lock();
            if !inner.removed {
                inner.state = SlotState::Idle(session);
                inner.last_error = None;
            }
        }
        self.available.notify_waiters();
    }

    /// Drop a leased session and leave the slot empty
    fn discard(&self, session: Session, error: Option<ConnectionError>) {
        {
            let mut inner = self.lock();
            if !inner.removed {
                inner.state = SlotState::Empty;
                if error.is_some() {
                    inner.last_error = error;
                }
            }
        }
        drop(session);
        self.available.notify_waiters();
    }

    /// Publish the result of an open attempt
    fn finish_open(&self, result: Result<Session, ConnectionError>) -> Result<(), ConnectionError> {
        let name = &self.descriptor.name;
        let outcome = {
            let mut inner = self.lock();
            match result {
                Ok(_session) if inner.removed => {
                    debug!(backend = %name, "Backend removed while opening; discarding session");
                    Ok(())
                }
                Ok(session) => {
                    inner.state = SlotState::Idle(session);
                    inner.last_error = None;
                    info!(backend = %name, address = %self.descriptor.address(), "Session opened");
                    Ok(())
                }
                Err(e) => {
                    self.opens_failed.fetch_add(1, Ordering::Relaxed);
                    if !inner.removed {
                        inner.state = SlotState::Empty;
                        inner.last_error = Some(e.clone());
                    }
                    log_open_failure(name, &e);
                    Err(e)
                }
            }
        };
        self.available.notify_waiters();
        outcome
    }

    /// Mark the slot removed and hand back the idle session, if any
    fn retire(&self) -> Option<Session> {
        let idle = {
            let mut inner = self.lock();
            inner.removed = true;
            match std::mem::replace(&mut inner.state, SlotState::Empty) {
                SlotState::Idle(session) => Some(session),
                _ => None,
            }
        };
        self.available.notify_waiters();
        idle
    }

    fn runtime_state(&self) -> BackendRuntimeState {
        let inner = self.lock();
        match &inner.state {
            SlotState::Idle(_) | SlotState::Leased => BackendRuntimeState::Online,
            _ if inner.last_error.is_some() => BackendRuntimeState::Degraded,
            _ => BackendRuntimeState::Offline,
        }
    }
}

fn log_open_failure(name: &BackendName, e: &ConnectionError) {
    match e.log_level() {
        tracing::Level::ERROR => error!(backend = %name, error = %e, "Failed to open session"),
        tracing::Level::WARN => warn!(backend = %name, error = %e, "Failed to open session"),
        _ => debug!(backend = %name, error = %e, "Failed to open session"),
    }
}

enum Step<'a> {
    Check(Session),
    AwaitOpen(OpenFuture),
    AwaitRelease(tokio::sync::futures::Notified<'a>),
}

/// One session per backend, opened lazily and recycled
pub struct SessionPool {
    slots: DashMap<BackendName, Arc<Slot>>,
    connector: Arc<dyn Connector>,
    config: PoolConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("backends", &self.slots.len())
            .field("connector", &self.connector)
            .field("config", &self.config)
            .finish()
    }
}

impl SessionPool {
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self::with_connector(config, Arc::new(TcpConnector))
    }

    #[must_use]
    pub fn with_connector(config: PoolConfig, connector: Arc<dyn Connector>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            slots: DashMap::new(),
            connector,
            config,
            shutdown_tx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Create an empty slot for a backend
    pub fn add_backend(&self, descriptor: Arc<BackendDescriptor>) -> Result<(), ProxyError> {
        use dashmap::mapref::entry::Entry;

        match self.slots.entry(descriptor.name.clone()) {
            Entry::Occupied(_) => Err(ProxyError::DuplicateName(descriptor.name.clone())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Slot::new(descriptor)));
                Ok(())
            }
        }
    }

    /// Close the backend's session and forget the slot
    ///
    /// The slot is gone before the first `.await`. A session currently lent
    /// out is dropped when its handle comes back.
    pub async fn remove_backend(&self, name: &str) -> Result<(), ProxyError> {
        let (_, slot) = self
            .slots
            .remove(name)
            .ok_or_else(|| ProxyError::unknown(name))?;
        if let Some(mut session) = slot.retire() {
            session.close().await;
        }
        debug!(backend = %name, "Removed backend from pool");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    fn slot(&self, name: &str) -> Result<Arc<Slot>, ProxyError> {
        self.slots
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ProxyError::unknown(name))
    }

    /// Lease the backend's session, opening one if needed
    pub async fn acquire(&self, name: &str) -> Result<SessionHandle, ProxyError> {
        let slot = self.slot(name)?;
        let mut deadline: Option<Instant> = None;

        loop {
            let step = {
                let mut inner = slot.lock();
                if inner.removed {
                    return Err(ProxyError::unknown(name));
                }
                match std::mem::replace(&mut inner.state, SlotState::Leased) {
                    SlotState::Idle(session) => Step::Check(session),
                    SlotState::Empty => {
                        let open = self.start_open(&slot);
                        inner.state = SlotState::Opening(open.clone());
                        Step::AwaitOpen(open)
                    }
                    SlotState::Opening(open) => {
                        inner.state = SlotState::Opening(open.clone());
                        Step::AwaitOpen(open)
                    }
                    SlotState::Leased => Step::AwaitRelease(slot.available.notified()),
                }
            };

            match step {
                Step::Check(session) => {
                    let verdict = check_idle_session(&session, self.config.idle_timeout);
                    if verdict.is_healthy() {
                        return Ok(SessionHandle::new(Arc::clone(&slot), session));
                    }
                    debug!(backend = %name, reason = %verdict, "Replacing idle session");
                    slot.discard(session, None);
                }
                Step::AwaitOpen(open) => open.await?,
                Step::AwaitRelease(notified) => {
                    let deadline =
                        *deadline.get_or_insert_with(|| Instant::now() + self.config.acquire_timeout);
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return Err(ProxyError::PoolExhausted {
                            backend: name.to_string(),
                            waited: self.config.acquire_timeout,
                        });
                    }
                }
            }
        }
    }

    fn start_open(&self, slot: &Arc<Slot>) -> OpenFuture {
        let connector = Arc::clone(&self.connector);
        let connect_timeout = self.config.connect_timeout;
        let task_slot = Arc::clone(slot);
        let task = tokio::spawn(async move {
            task_slot.opens_attempted.fetch_add(1, Ordering::Relaxed);
            debug!(backend = %task_slot.descriptor.name, "Opening session");
            let result = connector.open(&task_slot.descriptor, connect_timeout).await;
            task_slot.finish_open(result)
        });

        let slot = Arc::clone(slot);
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => slot.finish_open(Err(ConnectionError::protocol(
                    &slot.descriptor.name,
                    format!("open task failed: {}", join_error),
                ))),
            }
        }
        .boxed()
        .shared()
    }

    /// Return a session for reuse
    pub fn release(&self, handle: SessionHandle) {
        handle.release();
    }

    /// Discard a session after a failure
    pub fn invalidate(&self, handle: SessionHandle) {
        handle.invalidate();
    }

    /// Open the backend's session ahead of the first command
    pub async fn warm_up(&self, name: &str) -> Result<(), ProxyError> {
        self.acquire(name).await?.release();
        Ok(())
    }

    pub fn runtime_state(&self, name: &str) -> Result<BackendRuntimeState, ProxyError> {
        Ok(self.slot(name)?.runtime_state())
    }

    pub fn stats(&self, name: &str) -> Result<PoolStats, ProxyError> {
        let slot = self.slot(name)?;
        let state = slot.runtime_state();
        let last_error = slot.lock().last_error.as_ref().map(ToString::to_string);
        Ok(PoolStats {
            state,
            opens_attempted: slot.opens_attempted.load(Ordering::Relaxed),
            opens_failed: slot.opens_failed.load(Ordering::Relaxed),
            last_error,
        })
    }

    /// Close idle sessions that are expired or whose peer went away
    pub async fn reap_idle(&self) -> usize {
        let slots: Vec<Arc<Slot>> = self.slots.iter().map(|e| Arc::clone(e.value())).collect();
        let mut expired = Vec::new();

        for slot in slots {
            let mut inner = slot.lock();
            let verdict = match &inner.state {
                SlotState::Idle(session) => check_idle_session(session, self.config.idle_timeout),
                _ => continue,
            };
            if verdict.is_healthy() {
                continue;
            }
            debug!(backend = %slot.descriptor.name, reason = %verdict, "Reaping idle session");
            if let SlotState::Idle(session) = std::mem::replace(&mut inner.state, SlotState::Empty) {
                expired.push(session);
            }
        }

        let reaped = expired.len();
        for mut session in expired {
            session.close().await;
        }
        reaped
    }

    /// Run [`reap_idle`](Self::reap_idle) every `idle_check_interval` until
    /// [`shutdown`](Self::shutdown) or the pool is dropped
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let pool = Arc::downgrade(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let period = self.config.idle_check_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(pool) = pool.upgrade() else { break };
                        let reaped = pool.reap_idle().await;
                        if reaped > 0 {
                            debug!(reaped, "Idle reaper closed sessions");
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            debug!("Idle reaper stopped");
        })
    }

    /// Stop the reaper and close every session
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        let slots: Vec<Arc<Slot>> = self.slots.iter().map(|e| Arc::clone(e.value())).collect();
        self.slots.clear();
        let idle: Vec<Session> = slots.iter().filter_map(|slot| slot.retire()).collect();
        for mut session in idle {
            session.close().await;
        }
        info!("Session pool shut down");
    }
}
