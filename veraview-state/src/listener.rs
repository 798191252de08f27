//! Listener registry and best-effort notification.

use std::error::Error as StdError;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use veraview_core::ChangeReason;

/// Outcome of a single listener notification.
pub type ListenerResult = std::result::Result<(), Box<dyn StdError>>;

/// Receiver of state change notifications.
pub trait StateListener {
    /// Called once per fired change with the categories that changed.
    ///
    /// # Errors
    /// A failure is logged by the notifier and does not affect other listeners.
    fn on_state_change(&self, reason: ChangeReason) -> ListenerResult;
}

/// Adapts a plain closure into a [`StateListener`].
pub struct FnListener<F>(F);

impl<F: Fn(ChangeReason)> FnListener<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: Fn(ChangeReason)> StateListener for FnListener<F> {
    fn on_state_change(&self, reason: ChangeReason) -> ListenerResult {
        (self.0)(reason);
        Ok(())
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnListener")
    }
}

/// Ordered, duplicate-free listener collection keyed by pointer identity.
#[derive(Default, Clone)]
pub struct Listeners {
    entries: Vec<Rc<dyn StateListener>>,
}

impl Listeners {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the listener unless it is already registered.
    ///
    /// Returns true if it was added.
    pub fn add(&mut self, listener: Rc<dyn StateListener>) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.entries.push(listener);
        true
    }

    /// Removes the listener if registered.
    ///
    /// Returns true if it was removed.
    pub fn remove(&mut self, listener: &Rc<dyn StateListener>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| !same_listener(entry, listener));
        self.entries.len() != before
    }

    /// Returns true if the listener is registered.
    #[must_use]
    pub fn contains(&self, listener: &Rc<dyn StateListener>) -> bool {
        self.entries.iter().any(|entry| same_listener(entry, listener))
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the current registration list, in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<dyn StateListener>> {
        self.entries.clone()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish()
    }
}

fn same_listener(a: &Rc<dyn StateListener>, b: &Rc<dyn StateListener>) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

/// Notifies every listener in order.
///
/// Does nothing for [`ChangeReason::NOOP`]. Errors and panics raised by a
/// listener are logged and the remaining listeners are still notified.
pub fn dispatch(listeners: &[Rc<dyn StateListener>], reason: ChangeReason) {
    if reason.is_noop() {
        return;
    }
    for (i, listener) in listeners.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| listener.on_state_change(reason))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::error!("state listener #{i} failed handling [{reason}]: {err}");
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!("state listener #{i} panicked handling [{reason}]: {message}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use veraview_core::StateChange;

    #[derive(Default)]
    struct Recorder {
        seen: RefCell<Vec<ChangeReason>>,
    }

    impl StateListener for Recorder {
        fn on_state_change(&self, reason: ChangeReason) -> ListenerResult {
            self.seen.borrow_mut().push(reason);
            Ok(())
        }
    }

    struct Failing;

    impl StateListener for Failing {
        fn on_state_change(&self, _reason: ChangeReason) -> ListenerResult {
            Err("view is gone".into())
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut listeners = Listeners::new();
        let recorder: Rc<dyn StateListener> = Rc::new(Recorder::default());

        assert!(listeners.add(recorder.clone()));
        assert!(!listeners.add(recorder.clone()));
        assert_eq!(listeners.len(), 1);

        assert!(listeners.remove(&recorder));
        assert!(!listeners.remove(&recorder));
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_dispatch_skips_noop() {
        let recorder = Rc::new(Recorder::default());
        let listeners: Vec<Rc<dyn StateListener>> = vec![recorder.clone()];
        dispatch(&listeners, ChangeReason::NOOP);
        assert!(recorder.seen.borrow().is_empty());
    }

    #[test]
    fn test_dispatch_isolates_errors() {
        let recorder = Rc::new(Recorder::default());
        let listeners: Vec<Rc<dyn StateListener>> = vec![Rc::new(Failing), recorder.clone()];
        let reason = ChangeReason::of(StateChange::ScaleMode);

        dispatch(&listeners, reason);
        assert_eq!(recorder.seen.borrow().as_slice(), &[reason]);
    }

    #[test]
    fn test_fn_listener() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let listener = FnListener::new(move |reason| sink.borrow_mut().push(reason));

        listener
            .on_state_change(ChangeReason::of(StateChange::TimeValue))
            .unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }
}
