//! pilot-recorder - record mouse and keyboard input and replay it
//!
//! The engine captures a flat timeline of input events, stores it as JSON
//! and replays it with the recorded timing, a repeat count and a speed
//! factor. Front-ends drive everything through [`MacroEngine`].
//!
//! ## Backends
//!
//! - **virtual** (always available): in-process devices for headless use and
//!   tests, see [`platform::memory`]
//! - **native** (feature `native`): global hook and injection through `rdev`

pub mod engine;
pub mod error;
pub mod events;
pub mod hotkeys;
pub mod keys;
pub mod platform;
pub mod player;
pub mod recorder;
pub mod settings;
pub mod storage;

pub use engine::{EngineState, MacroEngine};
pub use error::{Error, ErrorCode, Result};
pub use events::{Action, Event, Macro, MouseButton, MAX_DELAY};
pub use hotkeys::HotkeyRegistry;
pub use keys::{Hotkey, KeyToken, Modifier};
pub use platform::{InputSink, InputSource, KeyInput, PointerInput, Subscription};
pub use player::{PlayOptions, Player, Repeat, ReplayStats};
pub use recorder::{Recorder, RecorderConfig};
pub use settings::{HotkeyAction, Settings};
pub use storage::MacroStore;

pub mod prelude {
    pub use crate::engine::{EngineState, MacroEngine};
    pub use crate::error::{Error, Result};
    pub use crate::events::*;
    pub use crate::keys::{Hotkey, KeyToken};
    pub use crate::platform::memory::{VirtualInput, VirtualSink};
    pub use crate::platform::{InputSink, InputSource};
    pub use crate::player::{PlayOptions, Player, Repeat, ReplayStats};
    pub use crate::recorder::Recorder;
    pub use crate::settings::{HotkeyAction, Settings};
    pub use crate::storage::MacroStore;

    #[cfg(feature = "native")]
    pub use crate::platform::native::{NativeInput, NativeSink};
}
