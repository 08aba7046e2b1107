//! Bookkeeping shared by every synchronizer of one registry
//!
//! A change on one viewport can travel through several synchronizers
//! before the originating call returns. The cascade serializes all of them
//! behind one re-entrant lock and keeps a claim set for the outermost pass:
//! the origin plus every member some pass has taken on. A pass claims its
//! recipients before writing any of them and writes only those it got, so
//! no synchronizer writes back to the origin or over a member another pass
//! of the same cascade is responsible for.

use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use crate::state::StateKind;
use crate::viewport::ViewportRef;

type Claim = (ViewportRef, StateKind);

#[derive(Default)]
struct CascadeState {
    depth: usize,
    claimed: AHashSet<Claim>,
}

pub(crate) struct Cascade {
    /// Re-entrant so that change events re-emitted on the propagating
    /// thread reach the per-synchronizer guard instead of blocking
    serial: ReentrantMutex<()>,
    /// Only touched while `serial` is held
    state: Mutex<CascadeState>,
}

impl Cascade {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            serial: ReentrantMutex::new(()),
            state: Mutex::new(CascadeState::default()),
        })
    }

    /// Serialize with every synchronizer sharing this cascade
    pub(crate) fn serialize(&self) -> ReentrantMutexGuard<'_, ()> {
        self.serial.lock()
    }

    /// Open a pass from `origin`. The outermost pass starts a fresh claim
    /// set holding only the origin; nested passes extend the current one.
    pub(crate) fn enter(&self, origin: &ViewportRef, kind: StateKind) -> CascadePass<'_> {
        let mut state = self.state.lock();
        if state.depth == 0 {
            state.claimed.clear();
        }
        state.depth += 1;
        state.claimed.insert((origin.clone(), kind));
        CascadePass(self)
    }

    /// Claim a member for writing. False if this cascade already has it.
    pub(crate) fn claim(&self, viewport: &ViewportRef, kind: StateKind) -> bool {
        self.state.lock().claimed.insert((viewport.clone(), kind))
    }

    /// Give a claim back when nothing was written
    pub(crate) fn release(&self, viewport: &ViewportRef, kind: StateKind) {
        self.state.lock().claimed.remove(&(viewport.clone(), kind));
    }

    fn leave(&self) {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.claimed.clear();
        }
    }
}

/// Closes a pass however it ends
pub(crate) struct CascadePass<'a>(&'a Cascade);

impl Drop for CascadePass<'_> {
    fn drop(&mut self) {
        self.0.leave();
    }
}
