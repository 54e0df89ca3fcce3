//! Error taxonomy for the record/replay engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::{Hotkey, KeyToken};
use crate::settings::HotkeyAction;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// `start()` called on a recorder that is already capturing
    #[error("a recording is already in progress")]
    AlreadyRecording,

    /// `play()` called while a playback session is running
    #[error("a playback is already in progress")]
    AlreadyPlaying,

    #[error("the macro is empty, record or open one first")]
    EmptyMacro,

    /// Input is not well-formed JSON
    #[error("corrupt macro data: {0}")]
    CorruptData(String),

    /// Well-formed JSON with missing or mistyped fields
    #[error("invalid macro schema: {0}")]
    Schema(String),

    /// The injection backend has no key for this token
    #[error("unresolved key: {0}")]
    UnresolvedKey(KeyToken),

    #[error("hotkey {hotkey} is already bound to {bound_to}")]
    HotkeyConflict {
        hotkey: Hotkey,
        bound_to: HotkeyAction,
    },

    #[error("invalid hotkey '{0}'")]
    InvalidHotkey(String),

    /// Hook installation or input injection failed in the OS layer
    #[error("platform error: {0}")]
    Platform(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyRecording,
    AlreadyPlaying,
    EmptyMacro,
    CorruptData,
    Schema,
    UnresolvedKey,
    HotkeyConflict,
    InvalidHotkey,
    Platform,
    Io,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::AlreadyRecording => ErrorCode::AlreadyRecording,
            Error::AlreadyPlaying => ErrorCode::AlreadyPlaying,
            Error::EmptyMacro => ErrorCode::EmptyMacro,
            Error::CorruptData(_) => ErrorCode::CorruptData,
            Error::Schema(_) => ErrorCode::Schema,
            Error::UnresolvedKey(_) => ErrorCode::UnresolvedKey,
            Error::HotkeyConflict { .. } => ErrorCode::HotkeyConflict,
            Error::InvalidHotkey(_) => ErrorCode::InvalidHotkey,
            Error::Platform(_) => ErrorCode::Platform,
            Error::Io(_) => ErrorCode::Io,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match e.classify() {
            Category::Data => Error::Schema(e.to_string()),
            Category::Io => Error::Io(e.into()),
            Category::Syntax | Category::Eof => Error::CorruptData(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_are_corrupt_data() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{\"events\": [")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), ErrorCode::CorruptData);
    }

    #[test]
    fn shape_errors_are_schema() {
        let err: Error = serde_json::from_str::<Vec<u32>>("[\"a\"]").unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::Schema);
    }

    #[test]
    fn codes_serialize_screaming() {
        let s = serde_json::to_string(&ErrorCode::HotkeyConflict).unwrap();
        assert_eq!(s, "\"HOTKEY_CONFLICT\"");
    }
}
