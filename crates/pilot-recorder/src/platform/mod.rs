//! Input boundary between the engine and the operating system
//!
//! [`InputSource`] delivers system-wide pointer and keyboard notifications,
//! [`InputSink`] synthesizes input. Two backends implement both:
//!
//! - [`memory`] - in-process virtual devices, for headless use and tests
//! - `native` - global hook and injection through `rdev` (feature `native`)

pub mod memory;

#[cfg(feature = "native")]
pub mod native;

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::error::Result;
use crate::events::MouseButton;
use crate::keys::KeyToken;

#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    Moved { x: i32, y: i32 },
    Button { x: i32, y: i32, button: MouseButton, pressed: bool },
    Wheel { x: i32, y: i32, dx: i32, dy: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyInput {
    pub key: KeyToken,
    pub pressed: bool,
}

pub type Handler<T> = Box<dyn FnMut(&T) + Send>;

/// Source of global input notifications
///
/// Handlers run on the backend's notification thread and must not block.
/// Dropping the returned [`Subscription`] detaches the handler; once the drop
/// returns the handler is never called again.
pub trait InputSource: Send + Sync {
    fn subscribe_pointer(&self, handler: Handler<PointerInput>) -> Result<Subscription>;
    fn subscribe_keyboard(&self, handler: Handler<KeyInput>) -> Result<Subscription>;
}

/// Input injection
pub trait InputSink: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> Result<()>;
    fn button(&self, button: MouseButton, pressed: bool) -> Result<()>;
    fn scroll(&self, dx: i32, dy: i32) -> Result<()>;
    /// Fails with `UnresolvedKey` when the backend has no such key
    fn key(&self, key: &KeyToken, pressed: bool) -> Result<()>;
}

/// Live handler registration, released on drop
#[must_use = "dropping a Subscription detaches its handler"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Release now; same as dropping
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

struct Table<T> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
}

/// Handler table shared by a backend's notification thread and its
/// subscribers
///
/// `emit` runs the handlers with the table locked, and releasing a
/// subscription takes the same lock, so a released handler cannot still be
/// running. Handlers must not subscribe or unsubscribe themselves.
pub struct Listeners<T> {
    table: Arc<Mutex<Table<T>>>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                next_id: 0,
                handlers: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, handler: Handler<T>) -> Subscription {
        let id = {
            let mut table = self.table.lock();
            let id = table.next_id;
            table.next_id += 1;
            table.handlers.push((id, handler));
            id
        };

        let table: Weak<Mutex<Table<T>>> = Arc::downgrade(&self.table);
        Subscription::new(move || {
            if let Some(table) = table.upgrade() {
                table.lock().handlers.retain(|(i, _)| *i != id);
            }
        })
    }

    pub fn emit(&self, input: &T) {
        let mut table = self.table.lock();
        for (_, handler) in table.handlers.iter_mut() {
            handler(input);
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn dropped_subscription_stops_delivery() {
        let listeners: Listeners<u32> = Listeners::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let sub = listeners.subscribe(Box::new(move |v| {
            h.fetch_add(*v as usize, Ordering::SeqCst);
        }));
        listeners.emit(&2);
        drop(sub);
        listeners.emit(&5);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(listeners.is_empty());
    }

    #[test]
    fn handlers_are_independent() {
        let listeners: Listeners<()> = Listeners::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let (a2, b2) = (a.clone(), b.clone());
        let sub_a = listeners.subscribe(Box::new(move |_| {
            a2.fetch_add(1, Ordering::SeqCst);
        }));
        let _sub_b = listeners.subscribe(Box::new(move |_| {
            b2.fetch_add(1, Ordering::SeqCst);
        }));

        listeners.emit(&());
        sub_a.cancel();
        listeners.emit(&());

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 2);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn subscription_outliving_table_is_harmless() {
        let listeners: Listeners<()> = Listeners::new();
        let sub = listeners.subscribe(Box::new(|_| {}));
        drop(listeners);
        drop(sub);
    }
}
