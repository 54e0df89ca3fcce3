//! Native backend on top of `rdev`
//!
//! `rdev::listen` installs a global hook that can never be removed, so the
//! process runs a single hook thread, started on the first subscription, and
//! fans its notifications out to the subscriber tables. Sessions come and go
//! by subscribing and dropping their [`Subscription`]s.

mod inject;
mod keymap;

pub use inject::NativeSink;
pub use keymap::{key_from_token, token_from_key};

use crossbeam_channel::{bounded, RecvTimeoutError};
use rdev::EventType;
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use super::{Handler, InputSource, KeyInput, Listeners, PointerInput, Subscription};
use crate::error::{Error, Result};

/// How long to wait for the hook to report a startup failure
const HOOK_STARTUP: Duration = Duration::from_millis(100);

static SHARED: OnceLock<Arc<NativeInput>> = OnceLock::new();

pub struct NativeInput {
    pointer: Listeners<PointerInput>,
    keyboard: Listeners<KeyInput>,
    hook: OnceLock<std::result::Result<(), String>>,
}

impl NativeInput {
    /// The process-wide instance
    pub fn shared() -> Arc<NativeInput> {
        SHARED
            .get_or_init(|| {
                Arc::new(NativeInput {
                    pointer: Listeners::new(),
                    keyboard: Listeners::new(),
                    hook: OnceLock::new(),
                })
            })
            .clone()
    }

    fn ensure_hook(&self) -> Result<()> {
        self.hook
            .get_or_init(|| start_hook(self.pointer.clone(), self.keyboard.clone()))
            .clone()
            .map_err(Error::Platform)
    }
}

impl InputSource for NativeInput {
    fn subscribe_pointer(&self, handler: Handler<PointerInput>) -> Result<Subscription> {
        self.ensure_hook()?;
        Ok(self.pointer.subscribe(handler))
    }

    fn subscribe_keyboard(&self, handler: Handler<KeyInput>) -> Result<Subscription> {
        self.ensure_hook()?;
        Ok(self.keyboard.subscribe(handler))
    }
}

fn start_hook(
    pointer: Listeners<PointerInput>,
    keyboard: Listeners<KeyInput>,
) -> std::result::Result<(), String> {
    let (err_tx, err_rx) = bounded::<String>(1);

    thread::Builder::new()
        .name("pilot-input-hook".into())
        .spawn(move || {
            let mut pos = (0, 0);
            let result = rdev::listen(move |event| {
                forward(event.event_type, &mut pos, &pointer, &keyboard);
            });
            if let Err(e) = result {
                error!("input hook failed: {:?}", e);
                let _ = err_tx.send(format!("input hook failed: {e:?}"));
            }
        })
        .map_err(|e| format!("could not start the input hook thread: {e}"))?;

    match err_rx.recv_timeout(HOOK_STARTUP) {
        Ok(msg) => Err(msg),
        Err(RecvTimeoutError::Timeout) => {
            info!("input hook installed");
            Ok(())
        }
        Err(RecvTimeoutError::Disconnected) => Err("input hook exited".into()),
    }
}

fn forward(
    event: EventType,
    pos: &mut (i32, i32),
    pointer: &Listeners<PointerInput>,
    keyboard: &Listeners<KeyInput>,
) {
    // Button and wheel notifications carry no position, use the last move
    let (x, y) = *pos;
    match event {
        EventType::MouseMove { x, y } => {
            *pos = (x.round() as i32, y.round() as i32);
            pointer.emit(&PointerInput::Moved { x: pos.0, y: pos.1 });
        }
        EventType::ButtonPress(b) => {
            if let Some(button) = keymap::button_from_rdev(b) {
                pointer.emit(&PointerInput::Button { x, y, button, pressed: true });
            }
        }
        EventType::ButtonRelease(b) => {
            if let Some(button) = keymap::button_from_rdev(b) {
                pointer.emit(&PointerInput::Button { x, y, button, pressed: false });
            }
        }
        EventType::Wheel { delta_x, delta_y } => {
            pointer.emit(&PointerInput::Wheel {
                x,
                y,
                dx: delta_x as i32,
                dy: delta_y as i32,
            });
        }
        EventType::KeyPress(k) => keyboard.emit(&KeyInput {
            key: token_from_key(k),
            pressed: true,
        }),
        EventType::KeyRelease(k) => keyboard.emit(&KeyInput {
            key: token_from_key(k),
            pressed: false,
        }),
    }
}
