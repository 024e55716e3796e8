//! Observable single-threaded state cells.
//!
//! A [`Store`] replaces the shared mutable singletons a browser app would
//! normally reach for: it is created once at the application root, cloned
//! into whoever needs it, and notifies subscribers after every update.
//! Listeners are detached by dropping (or calling
//! [`Subscription::unsubscribe`] on) the handle returned at registration.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Detaches a listener when dropped.
#[must_use = "dropping a Subscription detaches the listener immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// A handle with nothing to detach.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct ListenerSet<T> {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Callback<T>)>>,
}

/// Fan-out list of callbacks.
pub struct Listeners<T> {
    inner: Rc<ListenerSet<T>>,
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ListenerSet { next_id: Cell::new(0), entries: RefCell::new(Vec::new()) }),
        }
    }

    pub fn add(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.entries.borrow_mut().push((id, Rc::new(callback)));

        let weak: Weak<ListenerSet<T>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(set) = weak.upgrade() {
                set.entries.borrow_mut().retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    pub fn emit(&self, value: &T) {
        // Snapshot first: callbacks may subscribe or unsubscribe re-entrantly.
        let callbacks: Vec<Callback<T>> =
            self.inner.entries.borrow().iter().map(|(_, cb)| Rc::clone(cb)).collect();
        for cb in callbacks {
            cb(value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared, observable value.
pub struct Store<T> {
    value: Rc<RefCell<T>>,
    listeners: Listeners<T>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self { value: Rc::clone(&self.value), listeners: self.listeners.clone() }
    }
}

impl<T: Default + Clone + 'static> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> Store<T> {
    pub fn new(value: T) -> Self {
        Self { value: Rc::new(RefCell::new(value)), listeners: Listeners::new() }
    }

    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.notify();
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
        self.notify();
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.listeners.add(callback)
    }

    fn notify(&self) {
        let snapshot = self.get();
        self.listeners.emit(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_see_updates_until_dropped() {
        let store = Store::new(0u32);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let sub = store.subscribe(move |v| sink.borrow_mut().push(*v));
        store.set(1);
        store.update(|v| *v += 1);
        drop(sub);
        store.set(10);

        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(store.get(), 10);
    }

    #[test]
    fn unsubscribe_during_emit_is_safe() {
        let listeners: Listeners<u8> = Listeners::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0));

        let inner_slot = Rc::clone(&slot);
        let inner_hits = Rc::clone(&hits);
        let sub = listeners.add(move |_| {
            inner_hits.set(inner_hits.get() + 1);
            inner_slot.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(sub);

        listeners.emit(&1);
        listeners.emit(&2);
        assert_eq!(hits.get(), 1);
        assert!(listeners.is_empty());
    }
}
