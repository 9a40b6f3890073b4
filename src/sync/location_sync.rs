//! The location synchronization loop.
//!
//! [`LocationSync`] bridges the device's position feed to the shared remote
//! collection and mirrors that collection back into observable state.
//!
//! # Execution model
//!
//! All observable state is owned by a single actor task. Device callbacks
//! (through [`SyncHandle`]) and remote snapshots (through a forwarder task)
//! are both queued onto the actor's inbox, so every mutation happens on one
//! context, in arrival order. Presentation reads the state through a
//! `tokio::sync::watch` channel and never needs its own locking.
//!
//! Writes leave the actor through a second queue drained by a publisher task.
//! The actor never waits on the network, and writes still reach the store in
//! the order the fixes arrived. When the store falls behind, queued writes
//! already superseded by a newer fix for the same user are dropped, so the
//! backlog is bounded by the number of distinct users rather than fixes.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, SyncError};
use crate::store::{RemoteStore, Snapshot};
use crate::sync::device::DeviceLocator;
use crate::sync::region::Region;
use crate::sync::session::Session;
use crate::sync::table::PositionTable;
use crate::sync::types::{Authorization, PermissionAction, PermissionStatus, Position, UserId};

/// Most jobs the publisher takes off its queue at once.
const PUBLISH_BATCH: usize = 256;

/// State published to presentation after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    /// Latest valid fix reported by the device
    pub current_position: Option<Position>,
    pub permission: PermissionStatus,
    /// Mirrors `permission == Denied`; drives the "enable location" prompt
    pub permission_denied: bool,
    /// Mirror of the remote collection
    pub positions: PositionTable,
}

impl SyncState {
    /// Users to draw on the map: everyone not sitting on the device's own
    /// coordinate, ordered by id.
    pub fn other_users(&self) -> Vec<(&UserId, &Position)> {
        self.positions.others_than(self.current_position.as_ref())
    }

    /// Camera region centered on the device, or the default region before
    /// the first fix.
    pub fn camera(&self) -> Region {
        match &self.current_position {
            Some(position) => Region::default().centered_on(position),
            None => Region::default(),
        }
    }
}

enum SyncEvent {
    Start,
    PositionUpdate(Position),
    PermissionChange(Authorization),
    LocatorError(String),
    SubscribeRemote,
    RemoteSnapshot(Result<Snapshot, StoreError>),
    Flush(oneshot::Sender<()>),
}

enum Publish {
    Write(UserId, Position),
    Flush(oneshot::Sender<()>),
}

/// Callback surface for the device locator.
///
/// Cheap to clone and safe to call from any thread. Every call only queues an
/// event for the sync actor and returns immediately.
#[derive(Clone)]
pub struct SyncHandle {
    events: mpsc::UnboundedSender<SyncEvent>,
}

impl SyncHandle {
    /// The device reported a new fix.
    pub fn on_position_update(&self, position: Position) {
        self.send(SyncEvent::PositionUpdate(position));
    }

    /// The device reported a batch of fixes; only the newest one matters.
    pub fn on_locations_update(&self, positions: impl IntoIterator<Item = Position>) {
        if let Some(latest) = positions.into_iter().last() {
            self.on_position_update(latest);
        }
    }

    /// The platform permission grant changed.
    pub fn on_permission_change(&self, authorization: Authorization) {
        self.send(SyncEvent::PermissionChange(authorization));
    }

    /// The locator failed; logged only.
    pub fn on_locator_error(&self, message: impl Into<String>) {
        self.send(SyncEvent::LocatorError(message.into()));
    }

    fn send(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            debug!("{}, dropping event", SyncError::Closed);
        }
    }
}

/// Location synchronization loop for one client.
///
/// Must be created inside a tokio runtime. Dropping it stops the loop.
pub struct LocationSync {
    handle: SyncHandle,
    state: watch::Receiver<SyncState>,
    actor: JoinHandle<()>,
    publisher: JoinHandle<()>,
}

impl LocationSync {
    /// Wires the loop to its three collaborators and spawns its tasks.
    ///
    /// Nothing happens until [`start`](Self::start) and
    /// [`subscribe_to_remote_positions`](Self::subscribe_to_remote_positions)
    /// are called.
    pub fn new(
        locator: Arc<dyn DeviceLocator>,
        store: Arc<dyn RemoteStore>,
        session: Arc<dyn Session>,
    ) -> Self {
        let (events, inbox) = mpsc::unbounded_channel();
        let (queue, pending) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SyncState::default());

        let publisher = tokio::spawn(run_publisher(Arc::clone(&store), pending));

        let actor = Actor {
            locator,
            store,
            session,
            state: state_tx,
            publisher: queue,
            events: events.clone(),
            remote: None,
        };
        let actor = tokio::spawn(actor.run(inbox));

        LocationSync {
            handle: SyncHandle { events },
            state,
            actor,
            publisher,
        }
    }

    /// Checks the current permission and either starts updates, asks for
    /// permission, or raises the denied flag.
    pub fn start(&self) {
        self.handle.send(SyncEvent::Start);
    }

    /// Opens the standing subscription to every user's published position.
    ///
    /// A second call while the subscription is alive is ignored.
    pub fn subscribe_to_remote_positions(&self) {
        self.handle.send(SyncEvent::SubscribeRemote);
    }

    /// Callback handle to give to the device locator.
    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// A copy of the current state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Resolves once every event queued before this call has been applied
    /// and every write it produced has been attempted.
    pub async fn flush(&self) -> Result<(), SyncError> {
        let (done, finished) = oneshot::channel();
        self.handle
            .events
            .send(SyncEvent::Flush(done))
            .map_err(|_| SyncError::Closed)?;
        finished.await.map_err(|_| SyncError::Closed)
    }
}

impl Drop for LocationSync {
    fn drop(&mut self) {
        self.actor.abort();
        self.publisher.abort();
    }
}

struct Actor {
    locator: Arc<dyn DeviceLocator>,
    store: Arc<dyn RemoteStore>,
    session: Arc<dyn Session>,
    state: watch::Sender<SyncState>,
    publisher: mpsc::UnboundedSender<Publish>,
    events: mpsc::UnboundedSender<SyncEvent>,
    remote: Option<JoinHandle<()>>,
}

impl Actor {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<SyncEvent>) {
        while let Some(event) = inbox.recv().await {
            match event {
                SyncEvent::Start => self.start(),
                SyncEvent::PositionUpdate(position) => self.position_update(position),
                SyncEvent::PermissionChange(authorization) => {
                    self.apply_authorization(authorization)
                }
                SyncEvent::LocatorError(message) => {
                    error!("Location manager failed with error: {}", message)
                }
                SyncEvent::SubscribeRemote => self.subscribe_remote(),
                SyncEvent::RemoteSnapshot(update) => self.remote_snapshot(update),
                SyncEvent::Flush(done) => {
                    // With the publisher gone there are no writes left to wait for
                    if let Err(mpsc::error::SendError(Publish::Flush(done))) =
                        self.publisher.send(Publish::Flush(done))
                    {
                        let _ = done.send(());
                    }
                }
            }
        }
    }

    fn start(&mut self) {
        let reported = self.locator.authorization();
        info!("Starting location sync with authorization {:?}", reported);
        self.apply_authorization(reported);
    }

    fn apply_authorization(&mut self, reported: Authorization) {
        let current = self.state.borrow().permission;
        let (next, action) = current.apply(reported);

        if next != current {
            info!("Location permission changed: {:?} -> {:?}", current, next);
            if next.is_denied() {
                warn!("{}", SyncError::PermissionDenied);
            }
        }

        self.state.send_if_modified(|state| {
            let changed = state.permission != next;
            state.permission = next;
            state.permission_denied = next.is_denied();
            changed
        });

        match action {
            PermissionAction::StartUpdates => self.locator.start_updating(),
            PermissionAction::StopUpdates => self.locator.stop_updating(),
            PermissionAction::RequestAuthorization => self.locator.request_authorization(),
        }
    }

    fn position_update(&mut self, position: Position) {
        if !position.is_valid() {
            warn!(
                "Discarding invalid fix ({}, {})",
                position.latitude, position.longitude
            );
            return;
        }

        self.state
            .send_modify(|state| state.current_position = Some(position));

        let Some(user) = self.session.current_user() else {
            debug!("{}", SyncError::Unauthenticated);
            return;
        };

        if self.publisher.send(Publish::Write(user, position)).is_err() {
            error!("Position publisher has stopped");
        }
    }

    fn subscribe_remote(&mut self) {
        if self.remote.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Already subscribed to remote positions");
            return;
        }

        info!("Subscribing to remote positions");
        let mut updates = self.store.subscribe();
        let events = self.events.clone();
        self.remote = Some(tokio::spawn(async move {
            while let Some(update) = updates.next().await {
                if events.send(SyncEvent::RemoteSnapshot(update)).is_err() {
                    break;
                }
            }
            debug!("Remote position subscription ended");
        }));
    }

    fn remote_snapshot(&mut self, update: Result<Snapshot, StoreError>) {
        match update {
            Ok(snapshot) => {
                let table = PositionTable::from_snapshot(&snapshot);
                debug!(
                    "Mirrored {} of {} remote positions",
                    table.len(),
                    snapshot.len()
                );
                self.state.send_modify(|state| state.positions = table);
            }
            // The previous mirror stays; the next snapshot corrects it
            Err(e) => error!("Error fetching user locations: {}", e),
        }
    }
}

impl Drop for Actor {
    fn drop(&mut self) {
        if let Some(remote) = self.remote.take() {
            remote.abort();
        }
    }
}

async fn run_publisher(store: Arc<dyn RemoteStore>, mut pending: mpsc::UnboundedReceiver<Publish>) {
    let mut batch = Vec::with_capacity(PUBLISH_BATCH);
    while pending.recv_many(&mut batch, PUBLISH_BATCH).await > 0 {
        let queued = batch.len();
        let jobs = coalesce(batch.drain(..));
        if jobs.len() < queued {
            debug!("Dropped {} superseded writes", queued - jobs.len());
        }

        for job in jobs {
            match job {
                Publish::Write(user, position) => match store.upsert(&user, position).await {
                    Ok(()) => debug!("Location saved for {}", user),
                    Err(e) => warn!("{}", SyncError::RemoteWriteFailed(e)),
                },
                Publish::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
}

/// Keeps only the newest write per user between flush markers, preserving
/// the relative order of what remains.
fn coalesce(jobs: impl DoubleEndedIterator<Item = Publish>) -> Vec<Publish> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Publish> = jobs
        .rev()
        .filter(|job| match job {
            Publish::Write(user, _) => seen.insert(user.clone()),
            Publish::Flush(_) => {
                seen.clear();
                true
            }
        })
        .collect();
    kept.reverse();
    kept
}
