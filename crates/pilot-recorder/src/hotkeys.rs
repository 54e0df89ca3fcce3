//! Global hotkeys
//!
//! The registry watches the keyboard stream and turns matching key-down
//! transitions into [`HotkeyAction`]s on a channel. It never calls into the
//! engine itself; the owner of the receiver decides what to do.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::keys::{Hotkey, KeyToken, Modifier};
use crate::platform::{InputSource, KeyInput, Subscription};
use crate::settings::HotkeyAction;

const QUEUE: usize = 16;

struct Bindings {
    table: Vec<(Hotkey, HotkeyAction)>,
    /// Keys currently down, to suppress auto-repeat and track modifiers
    held: HashSet<KeyToken>,
}

pub struct HotkeyRegistry {
    bindings: Arc<Mutex<Bindings>>,
    actions: Receiver<HotkeyAction>,
    _subscription: Subscription,
}

impl HotkeyRegistry {
    pub fn new(source: &dyn InputSource, record: Hotkey, play: Hotkey) -> Result<Self> {
        let table = validated(record, play)?;
        let bindings = Arc::new(Mutex::new(Bindings {
            table,
            held: HashSet::new(),
        }));
        let (tx, rx) = bounded(QUEUE);

        let handler_bindings = bindings.clone();
        let subscription = source.subscribe_keyboard(Box::new(move |input| {
            on_key(&handler_bindings, &tx, input);
        }))?;

        Ok(Self {
            bindings,
            actions: rx,
            _subscription: subscription,
        })
    }

    /// Bind one action, keeping the other as is
    pub fn bind(&self, action: HotkeyAction, hotkey: Hotkey) -> Result<()> {
        let mut b = self.bindings.lock();
        if let Some((_, other)) = b.table.iter().find(|(h, a)| *h == hotkey && *a != action) {
            return Err(Error::HotkeyConflict {
                hotkey,
                bound_to: *other,
            });
        }
        b.table.retain(|(_, a)| *a != action);
        info!(%action, %hotkey, "hotkey bound");
        b.table.push((hotkey, action));
        Ok(())
    }

    /// Replace both bindings at once; on conflict nothing changes
    pub fn rebind(&self, record: Hotkey, play: Hotkey) -> Result<()> {
        let table = validated(record, play)?;
        self.bindings.lock().table = table;
        info!("hotkeys rebound");
        Ok(())
    }

    pub fn hotkey(&self, action: HotkeyAction) -> Option<Hotkey> {
        self.bindings
            .lock()
            .table
            .iter()
            .find(|(_, a)| *a == action)
            .map(|(h, _)| h.clone())
    }

    pub fn actions(&self) -> Receiver<HotkeyAction> {
        self.actions.clone()
    }
}

fn validated(record: Hotkey, play: Hotkey) -> Result<Vec<(Hotkey, HotkeyAction)>> {
    if record == play {
        return Err(Error::HotkeyConflict {
            hotkey: play,
            bound_to: HotkeyAction::ToggleRecord,
        });
    }
    Ok(vec![
        (record, HotkeyAction::ToggleRecord),
        (play, HotkeyAction::TogglePlay),
    ])
}

fn normalize(key: &KeyToken) -> KeyToken {
    match key.canonical() {
        Some(KeyToken::Char(c)) => KeyToken::Char(c.to_ascii_lowercase()),
        Some(k) => k,
        None => key.clone(),
    }
}

fn on_key(bindings: &Mutex<Bindings>, tx: &Sender<HotkeyAction>, input: &KeyInput) {
    let key = normalize(&input.key);
    let mut b = bindings.lock();

    if !input.pressed {
        b.held.remove(&key);
        return;
    }
    if !b.held.insert(key.clone()) || Modifier::of(&key).is_some() {
        return;
    }

    let held: BTreeSet<Modifier> = b.held.iter().filter_map(Modifier::of).collect();
    let Some(action) = b
        .table
        .iter()
        .find(|(h, _)| h.matches(&key, &held))
        .map(|(_, a)| *a)
    else {
        return;
    };
    drop(b);

    match tx.try_send(action) {
        Ok(()) => debug!(%action, "hotkey fired"),
        Err(TrySendError::Full(_)) => warn!(%action, "hotkey queue full, dropped"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::VirtualInput;

    fn hk(s: &str) -> Hotkey {
        s.parse().unwrap()
    }

    fn registry(input: &VirtualInput) -> HotkeyRegistry {
        HotkeyRegistry::new(input, hk("f10"), hk("f6")).unwrap()
    }

    #[test]
    fn fires_once_per_press() {
        let input = VirtualInput::new();
        let reg = registry(&input);
        let rx = reg.actions();

        input.key_down(KeyToken::named("f10"));
        input.key_down(KeyToken::named("f10"));
        input.key_down(KeyToken::named("f10"));
        input.key_up(KeyToken::named("f10"));
        input.tap(KeyToken::named("f6"));

        assert_eq!(rx.try_recv().unwrap(), HotkeyAction::ToggleRecord);
        assert_eq!(rx.try_recv().unwrap(), HotkeyAction::TogglePlay);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let input = VirtualInput::new();
        let reg = HotkeyRegistry::new(&input, hk("ctrl+shift+r"), hk("f6")).unwrap();
        let rx = reg.actions();

        input.tap(KeyToken::Char('r'));
        input.key_down(KeyToken::named("ctrl_r"));
        input.tap(KeyToken::Char('r'));
        input.key_down(KeyToken::named("shift"));
        input.tap(KeyToken::Char('R'));
        assert_eq!(rx.try_recv().unwrap(), HotkeyAction::ToggleRecord);
        assert!(rx.try_recv().is_err());

        // extra modifier held
        input.key_down(KeyToken::named("alt"));
        input.tap(KeyToken::Char('r'));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn conflicting_bind_keeps_old_binding() {
        let input = VirtualInput::new();
        let reg = registry(&input);

        let err = reg.bind(HotkeyAction::TogglePlay, hk("f10")).unwrap_err();
        assert!(matches!(
            err,
            Error::HotkeyConflict { bound_to: HotkeyAction::ToggleRecord, .. }
        ));
        assert_eq!(reg.hotkey(HotkeyAction::TogglePlay), Some(hk("f6")));

        let rx = reg.actions();
        input.tap(KeyToken::named("f10"));
        assert_eq!(rx.try_recv().unwrap(), HotkeyAction::ToggleRecord);
    }

    #[test]
    fn rebind_swaps_both() {
        let input = VirtualInput::new();
        let reg = registry(&input);
        let rx = reg.actions();

        assert!(reg.rebind(hk("f1"), hk("f1")).is_err());
        reg.rebind(hk("f6"), hk("f10")).unwrap();

        input.tap(KeyToken::named("f6"));
        assert_eq!(rx.try_recv().unwrap(), HotkeyAction::ToggleRecord);
        input.tap(KeyToken::named("f10"));
        assert_eq!(rx.try_recv().unwrap(), HotkeyAction::TogglePlay);
    }

    #[test]
    fn bind_moves_an_action() {
        let input = VirtualInput::new();
        let reg = registry(&input);
        let rx = reg.actions();

        reg.bind(HotkeyAction::TogglePlay, hk("alt+p")).unwrap();
        input.tap(KeyToken::named("f6"));
        assert!(rx.try_recv().is_err());

        input.key_down(KeyToken::named("alt_l"));
        input.tap(KeyToken::Char('p'));
        assert_eq!(rx.try_recv().unwrap(), HotkeyAction::TogglePlay);
    }

    #[test]
    fn dropping_releases_the_subscription() {
        let input = VirtualInput::new();
        let reg = registry(&input);
        assert_eq!(input.subscribers(), 1);
        drop(reg);
        assert_eq!(input.subscribers(), 0);
    }
}
