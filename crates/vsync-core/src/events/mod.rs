use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use ahash::AHashMap;

use crate::state::{StateKind, StateSnapshot};
use crate::viewport::ViewportRef;

/// Fired by the rendering layer when a viewport's camera or VOI changes
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub origin: ViewportRef,
    pub state: StateSnapshot,
}

impl ChangeNotification {
    pub fn new(origin: ViewportRef, state: StateSnapshot) -> Self {
        Self { origin, state }
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }
}

/// Handler invoked synchronously for every matching notification
pub type ChangeHandler = Arc<dyn Fn(&ChangeNotification) + Send + Sync>;

/// Disposer returned by a subscription; pass it back to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type Key = (ViewportRef, StateKind);

#[derive(Default)]
struct BusState {
    handlers: AHashMap<Key, Vec<(SubscriptionId, ChangeHandler)>>,
    keys: AHashMap<SubscriptionId, Key>,
}

/// Per-(viewport, state kind) publish/subscribe channel
///
/// Handlers run on the publishing thread. The handler list is copied out
/// before dispatch, so a handler may publish further notifications or
/// (un)subscribe without deadlocking the bus.
pub struct ViewportEventBus {
    state: Arc<Mutex<BusState>>,
    next_id: AtomicU64,
}

impl ViewportEventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState::default())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to `kind` notifications originating from `viewport`
    pub fn subscribe(&self, viewport: &ViewportRef, kind: StateKind, handler: ChangeHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let key = (viewport.clone(), kind);

        let mut state = self.state.lock();
        state.handlers.entry(key.clone()).or_default().push((id, handler));
        state.keys.insert(id, key);
        id
    }

    /// Drop a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let Some(key) = state.keys.remove(&id) else {
            return false;
        };

        if let Some(handlers) = state.handlers.get_mut(&key) {
            handlers.retain(|(sub, _)| *sub != id);
            if handlers.is_empty() {
                state.handlers.remove(&key);
            }
        }
        true
    }

    /// Deliver a notification to every handler registered for its origin and kind
    pub fn publish(&self, notification: &ChangeNotification) -> usize {
        let key = (notification.origin.clone(), notification.kind());
        let handlers: Vec<ChangeHandler> = match self.state.lock().handlers.get(&key) {
            Some(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
            None => return 0,
        };

        for handler in &handlers {
            handler(notification);
        }
        handlers.len()
    }

    /// Number of live subscriptions for a viewport and kind
    pub fn subscriber_count(&self, viewport: &ViewportRef, kind: StateKind) -> usize {
        self.state
            .lock()
            .handlers
            .get(&(viewport.clone(), kind))
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

impl Default for ViewportEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CameraSnapshot;
    use std::sync::atomic::AtomicUsize;

    fn camera_change(viewport: &ViewportRef) -> ChangeNotification {
        ChangeNotification::new(viewport.clone(), StateSnapshot::Camera(CameraSnapshot::default()))
    }

    #[test]
    fn test_publish_matches_viewport_and_kind() {
        let bus = ViewportEventBus::new();
        let axial = ViewportRef::new("engine", "CT_AXIAL");
        let coronal = ViewportRef::new("engine", "CT_CORONAL");
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        bus.subscribe(&axial, StateKind::Camera, Arc::new(move |_: &ChangeNotification| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = hits.clone();
        bus.subscribe(&axial, StateKind::Voi, Arc::new(move |_: &ChangeNotification| {
            counter.fetch_add(100, Ordering::SeqCst);
        }));

        assert_eq!(bus.publish(&camera_change(&axial)), 1);
        assert_eq!(bus.publish(&camera_change(&coronal)), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_is_symmetric() {
        let bus = ViewportEventBus::new();
        let axial = ViewportRef::new("engine", "CT_AXIAL");

        let id = bus.subscribe(&axial, StateKind::Camera, Arc::new(|_: &ChangeNotification| {}));
        assert_eq!(bus.subscriber_count(&axial, StateKind::Camera), 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(&axial, StateKind::Camera), 0);
        assert_eq!(bus.publish(&camera_change(&axial)), 0);
    }

    #[test]
    fn test_handler_can_publish_reentrantly() {
        let bus = Arc::new(ViewportEventBus::new());
        let a = ViewportRef::new("engine", "A");
        let b = ViewportRef::new("engine", "B");
        let seen_b = Arc::new(AtomicUsize::new(0));

        let inner_bus = bus.clone();
        let forward_to = b.clone();
        bus.subscribe(&a, StateKind::Camera, Arc::new(move |_: &ChangeNotification| {
            inner_bus.publish(&camera_change(&forward_to));
        }));
        let counter = seen_b.clone();
        bus.subscribe(&b, StateKind::Camera, Arc::new(move |_: &ChangeNotification| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(&camera_change(&a));
        assert_eq!(seen_b.load(Ordering::SeqCst), 1);
    }
}
