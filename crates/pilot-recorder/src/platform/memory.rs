//! Virtual input devices
//!
//! [`VirtualInput`] is an input source driven by the caller; [`VirtualSink`]
//! keeps a timestamped log of everything injected into it.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

use super::{Handler, InputSink, InputSource, KeyInput, Listeners, PointerInput, Subscription};
use crate::error::{Error, Result};
use crate::events::MouseButton;
use crate::keys::KeyToken;

#[derive(Clone, Default)]
pub struct VirtualInput {
    pointer: Listeners<PointerInput>,
    keyboard: Listeners<KeyInput>,
}

impl VirtualInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&self, x: i32, y: i32) {
        self.pointer.emit(&PointerInput::Moved { x, y });
    }

    pub fn button(&self, x: i32, y: i32, button: MouseButton, pressed: bool) {
        self.pointer.emit(&PointerInput::Button { x, y, button, pressed });
    }

    pub fn wheel(&self, x: i32, y: i32, dx: i32, dy: i32) {
        self.pointer.emit(&PointerInput::Wheel { x, y, dx, dy });
    }

    pub fn key_down(&self, key: KeyToken) {
        self.keyboard.emit(&KeyInput { key, pressed: true });
    }

    pub fn key_up(&self, key: KeyToken) {
        self.keyboard.emit(&KeyInput { key, pressed: false });
    }

    /// Key down followed by key up
    pub fn tap(&self, key: KeyToken) {
        self.key_down(key.clone());
        self.key_up(key);
    }

    /// Number of live subscriptions across both streams
    pub fn subscribers(&self) -> usize {
        self.pointer.len() + self.keyboard.len()
    }
}

impl InputSource for VirtualInput {
    fn subscribe_pointer(&self, handler: Handler<PointerInput>) -> Result<Subscription> {
        Ok(self.pointer.subscribe(handler))
    }

    fn subscribe_keyboard(&self, handler: Handler<KeyInput>) -> Result<Subscription> {
        Ok(self.keyboard.subscribe(handler))
    }
}

/// One injected input
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    MoveTo { x: i32, y: i32 },
    Button { button: MouseButton, pressed: bool },
    Scroll { dx: i32, dy: i32 },
    Key { key: KeyToken, pressed: bool },
}

pub struct VirtualSink {
    created: Instant,
    log: Mutex<Vec<(Instant, Dispatched)>>,
}

impl VirtualSink {
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn dispatched(&self) -> Vec<Dispatched> {
        self.log.lock().iter().map(|(_, d)| d.clone()).collect()
    }

    /// Dispatched inputs with their offset from the sink's creation
    pub fn timeline(&self) -> Vec<(Duration, Dispatched)> {
        self.log
            .lock()
            .iter()
            .map(|(at, d)| (at.duration_since(self.created), d.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }

    fn record(&self, d: Dispatched) {
        trace!(?d, "virtual dispatch");
        self.log.lock().push((Instant::now(), d));
    }
}

impl Default for VirtualSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSink for VirtualSink {
    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        self.record(Dispatched::MoveTo { x, y });
        Ok(())
    }

    fn button(&self, button: MouseButton, pressed: bool) -> Result<()> {
        self.record(Dispatched::Button { button, pressed });
        Ok(())
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        self.record(Dispatched::Scroll { dx, dy });
        Ok(())
    }

    fn key(&self, key: &KeyToken, pressed: bool) -> Result<()> {
        let key = key
            .canonical()
            .ok_or_else(|| Error::UnresolvedKey(key.clone()))?;
        self.record(Dispatched::Key { key, pressed });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn sink_logs_in_order() {
        let sink = VirtualSink::new();
        sink.move_to(1, 2).unwrap();
        sink.button(MouseButton::Left, true).unwrap();
        sink.key(&KeyToken::named("Escape"), false).unwrap();

        assert_eq!(
            sink.dispatched(),
            vec![
                Dispatched::MoveTo { x: 1, y: 2 },
                Dispatched::Button { button: MouseButton::Left, pressed: true },
                Dispatched::Key { key: KeyToken::named("esc"), pressed: false },
            ]
        );
    }

    #[test]
    fn sink_rejects_unknown_keys() {
        let sink = VirtualSink::new();
        let err = sink.key(&KeyToken::named("hyper"), true).unwrap_err();
        assert!(matches!(err, Error::UnresolvedKey(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn input_reaches_subscribers() {
        let input = VirtualInput::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        let sub = input
            .subscribe_keyboard(Box::new(move |k| s.lock().push(k.clone())))
            .unwrap();
        input.tap(KeyToken::Char('q'));
        assert_eq!(input.subscribers(), 1);
        drop(sub);
        input.tap(KeyToken::Char('w'));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].pressed && !seen[1].pressed);
        assert_eq!(input.subscribers(), 0);
    }
}
