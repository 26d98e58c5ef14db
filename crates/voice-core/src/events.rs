use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Trait for receiving events from an entity.
/// Implementations must be Send + Sync (called from the native event thread).
pub trait EventListener<E>: Send + Sync {
    fn on_event(&self, event: E);
}

impl<E, F> EventListener<E> for F
where
    F: Fn(E) + Send + Sync,
{
    fn on_event(&self, event: E) {
        self(event)
    }
}

/// Handle returned by [`EventEmitter::add_listener`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registry<E> {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn EventListener<E>>)>>,
    next_id: AtomicU64,
}

/// Many-listener event emitter.
///
/// Dispatch iterates over a snapshot of the listener list, so a listener may
/// add or remove listeners (itself included) while an event is being emitted.
/// Changes apply from the next emission on.
pub struct EventEmitter<E> {
    registry: Arc<Registry<E>>,
}

impl<E> Clone for EventEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<E: Clone> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener<E>>) -> ListenerId {
        let id = ListenerId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Returns `false` when no listener was registered under `id`.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .registry
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn remove_all_listeners(&self) {
        self.registry
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn emit(&self, event: E) {
        let snapshot: Vec<Arc<dyn EventListener<E>>> = self
            .registry
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in snapshot {
            listener.on_event(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl EventListener<u32> for CountingListener {
        fn on_event(&self, _event: u32) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emitter_dispatches_to_multiple_listeners() {
        let emitter = EventEmitter::<u32>::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(Arc::new(CountingListener { count: count1.clone() }));
        emitter.add_listener(Arc::new(CountingListener { count: count2.clone() }));
        emitter.emit(7);

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closures_are_listeners() {
        let emitter = EventEmitter::<String>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        emitter.add_listener(Arc::new(move |e: String| sink.lock().unwrap().push(e)));

        emitter.emit("ringing".to_string());

        assert_eq!(*seen.lock().unwrap(), vec!["ringing".to_string()]);
    }

    #[test]
    fn removed_listener_receives_nothing() {
        let emitter = EventEmitter::<u32>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = emitter.add_listener(Arc::new(CountingListener { count: count.clone() }));

        assert!(emitter.remove_listener(id));
        assert!(!emitter.remove_listener(id));
        emitter.emit(1);

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn listener_can_remove_itself_during_dispatch() {
        let emitter = EventEmitter::<u32>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let inner_emitter = emitter.clone();
        let inner_slot = slot.clone();
        let inner_count = count.clone();
        let id = emitter.add_listener(Arc::new(move |_e: u32| {
            inner_count.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *inner_slot.lock().unwrap() {
                inner_emitter.remove_listener(id);
            }
        }));
        *slot.lock().unwrap() = Some(id);

        emitter.emit(1);
        emitter.emit(2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_added_during_dispatch_sees_next_event_only() {
        let emitter = EventEmitter::<u32>::new();
        let late = Arc::new(AtomicUsize::new(0));

        let inner_emitter = emitter.clone();
        let inner_late = late.clone();
        let added = Arc::new(AtomicUsize::new(0));
        emitter.add_listener(Arc::new(move |_e: u32| {
            if added.fetch_add(1, Ordering::SeqCst) == 0 {
                inner_emitter.add_listener(Arc::new(CountingListener {
                    count: inner_late.clone(),
                }));
            }
        }));

        emitter.emit(1);
        assert_eq!(late.load(Ordering::SeqCst), 0);
        emitter.emit(2);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }
}
