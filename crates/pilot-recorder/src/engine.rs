//! `MacroEngine` - the single object a front-end talks to
//!
//! Owns the recorder, the player, the hotkey registry, the current macro and
//! the settings. Recording and playback exclude each other.

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{Error, Result};
use crate::events::Macro;
use crate::hotkeys::HotkeyRegistry;
use crate::keys::KeyToken;
use crate::platform::{InputSink, InputSource};
use crate::player::{PlayOptions, Player, ReplayStats};
use crate::recorder::Recorder;
use crate::settings::{HotkeyAction, Settings};
use crate::storage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Idle,
    Recording,
    Playing,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineState::Idle => "idle",
            EngineState::Recording => "recording",
            EngineState::Playing => "playing",
        })
    }
}

pub struct MacroEngine {
    recorder: Recorder,
    player: Player,
    hotkeys: HotkeyRegistry,
    /// Also serializes the record/play transitions
    current: Mutex<Macro>,
    settings: Mutex<Settings>,
}

impl MacroEngine {
    pub fn new(
        source: Arc<dyn InputSource>,
        sink: Arc<dyn InputSink>,
        settings: Settings,
    ) -> Result<Self> {
        let hotkeys = HotkeyRegistry::new(
            source.as_ref(),
            settings.record_hotkey.clone(),
            settings.play_hotkey.clone(),
        )?;
        let recorder = Recorder::new(source);
        recorder.set_ignored_keys(hotkey_triggers(&settings));

        Ok(Self {
            recorder,
            player: Player::new(sink),
            hotkeys,
            current: Mutex::new(Macro::new()),
            settings: Mutex::new(settings),
        })
    }

    pub fn start_recording(&self) -> Result<()> {
        let _current = self.current.lock();
        if self.player.is_playing() {
            return Err(Error::AlreadyPlaying);
        }
        self.recorder.start()
    }

    /// Store the recording as the current macro, `None` if not recording
    pub fn stop_recording(&self) -> Option<usize> {
        let mut current = self.current.lock();
        let m = self.recorder.stop()?;
        let len = m.len();
        *current = m;
        Some(len)
    }

    /// Start or stop recording, returns the new state
    pub fn toggle_recording(&self) -> Result<EngineState> {
        if self.recorder.is_recording() {
            self.stop_recording();
        } else {
            self.start_recording()?;
        }
        Ok(self.state())
    }

    /// Play the current macro with the current settings
    pub fn play(&self) -> Result<()> {
        let current = self.current.lock();
        if self.recorder.is_recording() {
            return Err(Error::AlreadyRecording);
        }
        let options = {
            let s = self.settings.lock();
            PlayOptions::once().repeat(s.repeat()).speed(s.speed())
        };
        self.player.play(&current, options)
    }

    pub fn stop_playback(&self) -> Option<ReplayStats> {
        self.player.stop()
    }

    /// Block until the running playback finishes
    pub fn wait_playback(&self) -> Option<ReplayStats> {
        self.player.wait()
    }

    pub fn toggle_playback(&self) -> Result<EngineState> {
        if self.player.is_playing() {
            self.stop_playback();
        } else {
            self.play()?;
        }
        Ok(self.state())
    }

    pub fn state(&self) -> EngineState {
        if self.recorder.is_recording() {
            EngineState::Recording
        } else if self.player.is_playing() {
            EngineState::Playing
        } else {
            EngineState::Idle
        }
    }

    /// Replace the current macro with a file's contents, returns its length
    pub fn load(&self, path: impl AsRef<Path>) -> Result<usize> {
        let m = storage::load_file(path)?;
        let len = m.len();
        self.replace_macro(m)?;
        Ok(len)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let current = self.current.lock();
        if current.is_empty() {
            return Err(Error::EmptyMacro);
        }
        storage::save_file(path, &current)
    }

    pub fn current_macro(&self) -> Macro {
        self.current.lock().clone()
    }

    pub fn replace_macro(&self, m: Macro) -> Result<()> {
        let mut current = self.current.lock();
        if self.recorder.is_recording() {
            return Err(Error::AlreadyRecording);
        }
        *current = m;
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    /// Apply new settings; on a hotkey conflict nothing changes
    pub fn update_settings(&self, new: Settings) -> Result<()> {
        let mut settings = self.settings.lock();
        self.hotkeys
            .rebind(new.record_hotkey.clone(), new.play_hotkey.clone())?;
        self.recorder.set_ignored_keys(hotkey_triggers(&new));
        info!(?new, "settings updated");
        *settings = new;
        Ok(())
    }

    pub fn hotkey_actions(&self) -> Receiver<HotkeyAction> {
        self.hotkeys.actions()
    }

    pub fn handle_hotkey(&self, action: HotkeyAction) -> Result<EngineState> {
        match action {
            HotkeyAction::ToggleRecord => self.toggle_recording(),
            HotkeyAction::TogglePlay => self.toggle_playback(),
        }
    }

    /// Stop whatever is running; a recording in progress is kept
    pub fn shutdown(&self) {
        self.stop_recording();
        self.stop_playback();
    }
}

// Triggers of modifier-less hotkeys, kept out of recordings
fn hotkey_triggers(settings: &Settings) -> Vec<KeyToken> {
    [&settings.record_hotkey, &settings.play_hotkey]
        .into_iter()
        .filter(|h| h.modifiers().is_empty())
        .map(|h| h.key().clone())
        .collect()
}
