//! Synchronizer state machine

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use indexmap::IndexSet;
use parking_lot::RwLock;

use super::cascade::Cascade;
use super::{Applied, SyncAdapter};
use crate::error::{Result, SyncError};
use crate::events::{ChangeHandler, ChangeNotification, SubscriptionId};
use crate::render::RenderingLayer;
use crate::state::StateKind;
use crate::viewport::ViewportRef;

/// Lifecycle of a synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchronizerState {
    /// Constructed but not yet registered
    Uninitialized,
    /// Reacting to change notifications
    Active,
    /// Keeps its members but ignores notifications
    Disabled,
    /// Terminal; every operation fails with [`SyncError::Disposed`]
    Disposed,
}

/// Propagation counters of one synchronizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Propagation passes started by a source change
    pub passes: u64,
    /// Notifications dropped by the re-entrancy guard
    pub suppressed: u64,
    /// Members written
    pub applied: u64,
    /// Members the adapter had nothing to write to
    pub skipped: u64,
    /// Members that failed to accept the state
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    passes: AtomicU64,
    suppressed: AtomicU64,
    applied: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SyncStats {
        SyncStats {
            passes: self.passes.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Default)]
struct Members {
    sources: IndexSet<ViewportRef>,
    targets: IndexSet<ViewportRef>,
    subscriptions: AHashMap<ViewportRef, SubscriptionId>,
}

/// Clears the in-propagation flag however the pass ends
struct PropagationGuard<'a>(&'a AtomicBool);

impl Drop for PropagationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Links a set of viewports for one state kind
pub struct Synchronizer {
    id: String,
    adapter: Box<dyn SyncAdapter>,
    layer: Arc<dyn RenderingLayer>,
    /// Shared with the other synchronizers of the same registry
    cascade: Arc<Cascade>,
    members: RwLock<Members>,
    state: RwLock<SynchronizerState>,
    in_propagation: AtomicBool,
    counters: Counters,
    this: Weak<Synchronizer>,
}

impl Synchronizer {
    /// Create an unregistered synchronizer with a cascade of its own
    pub fn new(id: impl Into<String>, adapter: Box<dyn SyncAdapter>, layer: Arc<dyn RenderingLayer>) -> Arc<Self> {
        Self::with_cascade(id, adapter, layer, Cascade::new())
    }

    pub(crate) fn with_cascade(
        id: impl Into<String>,
        adapter: Box<dyn SyncAdapter>,
        layer: Arc<dyn RenderingLayer>,
        cascade: Arc<Cascade>,
    ) -> Arc<Self> {
        let id = id.into();
        Arc::new_cyclic(|this| Self {
            id,
            adapter,
            layer,
            cascade,
            members: RwLock::new(Members::default()),
            state: RwLock::new(SynchronizerState::Uninitialized),
            in_propagation: AtomicBool::new(false),
            counters: Counters::default(),
            this: this.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> StateKind {
        self.adapter.kind()
    }

    pub fn state(&self) -> SynchronizerState {
        *self.state.read()
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == SynchronizerState::Active
    }

    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// Move from `Uninitialized` to `Active`; later states are left alone
    pub(crate) fn activate(&self) {
        let mut state = self.state.write();
        if *state == SynchronizerState::Uninitialized {
            *state = SynchronizerState::Active;
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state() == SynchronizerState::Disposed {
            return Err(SyncError::Disposed(self.id.clone()));
        }
        Ok(())
    }

    /// Add a source member and listen to its change events
    pub fn add_source(&self, viewport: ViewportRef) -> Result<()> {
        let _serial = self.cascade.serialize();
        self.ensure_live()?;

        let mut members = self.members.write();
        if !members.sources.insert(viewport.clone()) {
            return Ok(());
        }

        if !members.subscriptions.contains_key(&viewport) {
            let this = self.this.clone();
            let handler: ChangeHandler = Arc::new(move |notification: &ChangeNotification| {
                if let Some(sync) = this.upgrade() {
                    sync.on_source_changed(notification);
                }
            });
            let subscription = self.layer.subscribe(&viewport, self.adapter.kind(), handler);
            members.subscriptions.insert(viewport.clone(), subscription);
            tracing::debug!(
                "Synchronizer '{}' added source {} (subscription {})",
                self.id,
                viewport,
                subscription.raw()
            );
        }
        Ok(())
    }

    /// Alias of [`Synchronizer::add_source`]
    pub fn add(&self, viewport: ViewportRef) -> Result<()> {
        self.add_source(viewport)
    }

    /// Add a member that receives propagated state but is never listened to
    pub fn add_target(&self, viewport: ViewportRef) -> Result<()> {
        let _serial = self.cascade.serialize();
        self.ensure_live()?;

        if self.members.write().targets.insert(viewport.clone()) {
            tracing::debug!("Synchronizer '{}' added target {}", self.id, viewport);
        }
        Ok(())
    }

    /// Remove a viewport from both member sets. Returns whether it was a member.
    pub fn remove(&self, viewport: &ViewportRef) -> Result<bool> {
        let _serial = self.cascade.serialize();
        self.ensure_live()?;

        let mut members = self.members.write();
        let was_source = members.sources.shift_remove(viewport);
        let was_target = members.targets.shift_remove(viewport);

        if let Some(subscription) = members.subscriptions.remove(viewport) {
            self.layer.unsubscribe(subscription);
        }

        Ok(was_source || was_target)
    }

    /// Toggle propagation without touching membership
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let _serial = self.cascade.serialize();
        self.ensure_live()?;

        *self.state.write() = if enabled {
            SynchronizerState::Active
        } else {
            SynchronizerState::Disabled
        };
        tracing::info!("Synchronizer '{}' {}", self.id, if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    pub fn sources(&self) -> Vec<ViewportRef> {
        self.members.read().sources.iter().cloned().collect()
    }

    pub fn targets(&self) -> Vec<ViewportRef> {
        self.members.read().targets.iter().cloned().collect()
    }

    pub fn has_source(&self, viewport: &ViewportRef) -> bool {
        self.members.read().sources.contains(viewport)
    }

    pub fn has_target(&self, viewport: &ViewportRef) -> bool {
        self.members.read().targets.contains(viewport)
    }

    /// Unsubscribe from every member and enter the terminal state
    pub fn dispose(&self) -> Result<()> {
        let _serial = self.cascade.serialize();
        self.ensure_live()?;

        *self.state.write() = SynchronizerState::Disposed;

        let mut members = self.members.write();
        for (_, subscription) in members.subscriptions.drain() {
            self.layer.unsubscribe(subscription);
        }
        members.sources.clear();
        members.targets.clear();

        tracing::info!("Synchronizer '{}' disposed", self.id);
        Ok(())
    }

    /// Entry point for change events of source members
    pub fn on_source_changed(&self, notification: &ChangeNotification) {
        let _serial = self.cascade.serialize();
        if notification.kind() != self.adapter.kind() || !self.is_enabled() {
            return;
        }
        if !self.has_source(&notification.origin) {
            return;
        }
        self.propagate(notification);
    }

    /// Push the current state of `origin` to every other member.
    ///
    /// Change events only fire on later changes, so members that start out
    /// with different state (e.g. zoom levels of differently sized volumes)
    /// are aligned with this before interaction begins.
    pub fn sync_from(&self, origin: &ViewportRef) -> Result<()> {
        let _serial = self.cascade.serialize();
        self.ensure_live()?;
        if !self.is_enabled() {
            tracing::debug!("Synchronizer '{}' is disabled, not syncing from {}", self.id, origin);
            return Ok(());
        }

        for state in self.adapter.capture(self.layer.as_ref(), origin)? {
            self.propagate(&ChangeNotification::new(origin.clone(), state));
        }
        Ok(())
    }

    fn propagate(&self, notification: &ChangeNotification) {
        if self.in_propagation.swap(true, Ordering::AcqRel) {
            Counters::bump(&self.counters.suppressed);
            tracing::trace!(
                "Synchronizer '{}' suppressed re-entrant change from {}",
                self.id,
                notification.origin
            );
            return;
        }
        let _guard = PropagationGuard(&self.in_propagation);

        let Some(propagated) = self.adapter.extract(&notification.state) else {
            return;
        };
        let kind = self.adapter.kind();
        let _pass = self.cascade.enter(&notification.origin, kind);

        let recipients: IndexSet<ViewportRef> = {
            let members = self.members.read();
            members
                .sources
                .iter()
                .chain(members.targets.iter())
                .filter(|member| **member != notification.origin)
                .cloned()
                .collect()
        };

        // claim up front so passes nested in this one leave our members alone
        let (owned, taken): (Vec<&ViewportRef>, Vec<&ViewportRef>) =
            recipients.iter().partition(|target| self.cascade.claim(target, kind));

        Counters::bump(&self.counters.passes);
        tracing::debug!(
            "Synchronizer '{}' propagating {:?} change from {} to {} member(s)",
            self.id,
            kind,
            notification.origin,
            owned.len()
        );

        for target in taken {
            Counters::bump(&self.counters.skipped);
            tracing::trace!("Synchronizer '{}' skipped {}, already claimed in this cascade", self.id, target);
        }

        for target in owned {
            match self.adapter.apply(self.layer.as_ref(), &propagated, target) {
                Ok(Applied::Written) => {
                    Counters::bump(&self.counters.applied);
                    self.layer.request_render(target);
                }
                Ok(Applied::Skipped) => {
                    self.cascade.release(target, kind);
                    Counters::bump(&self.counters.skipped);
                    tracing::debug!("Synchronizer '{}' skipped {}", self.id, target);
                }
                Err(err) => {
                    self.cascade.release(target, kind);
                    Counters::bump(&self.counters.failed);
                    tracing::warn!("Synchronizer '{}' failed to update {}: {}", self.id, target, err);
                }
            }
        }
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members = self.members.read();
        f.debug_struct("Synchronizer")
            .field("id", &self.id)
            .field("kind", &self.adapter.kind())
            .field("state", &self.state())
            .field("sources", &members.sources)
            .field("targets", &members.targets)
            .finish()
    }
}
