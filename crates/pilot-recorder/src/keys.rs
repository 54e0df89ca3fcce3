//! Key identifiers shared by the recorder, the player and the hotkey registry
//!
//! A key is either a printable character (`Char`) or a symbolic name
//! (`Named`). Named keys use one canonical vocabulary for every backend;
//! `code:<n>` carries a raw platform key code the vocabulary has no name for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Canonical names of symbolic keys
pub const NAMED_KEYS: &[&str] = &[
    "alt", "alt_gr", "backspace", "caps_lock", "cmd", "cmd_r", "ctrl_l", "ctrl_r",
    "delete", "down", "end", "enter", "esc", "fn", "home", "insert", "left",
    "num_lock", "page_down", "page_up", "pause", "print_screen", "right",
    "scroll_lock", "shift", "shift_r", "space", "tab", "up",
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12",
    "kp_0", "kp_1", "kp_2", "kp_3", "kp_4", "kp_5", "kp_6", "kp_7", "kp_8", "kp_9",
    "kp_enter", "kp_minus", "kp_plus", "kp_multiply", "kp_divide", "kp_delete",
];

const ALIASES: &[(&str, &str)] = &[
    ("alt_l", "alt"),
    ("option", "alt"),
    ("alt_r", "alt_gr"),
    ("altgr", "alt_gr"),
    ("cmd_l", "cmd"),
    ("command", "cmd"),
    ("super", "cmd"),
    ("win", "cmd"),
    ("meta", "cmd"),
    ("ctrl", "ctrl_l"),
    ("control", "ctrl_l"),
    ("shift_l", "shift"),
    ("return", "enter"),
    ("escape", "esc"),
    ("del", "delete"),
    ("pageup", "page_up"),
    ("pagedown", "page_down"),
    ("capslock", "caps_lock"),
    ("arrow_up", "up"),
    ("arrow_down", "down"),
    ("arrow_left", "left"),
    ("arrow_right", "right"),
];

const CODE_PREFIX: &str = "code:";

/// Resolve a key name or alias to its canonical spelling
pub fn canonical_name(name: &str) -> Option<String> {
    let lower = name.trim().to_ascii_lowercase();
    if let Some(code) = lower.strip_prefix(CODE_PREFIX) {
        return code.parse::<u32>().ok().map(|c| format!("{CODE_PREFIX}{c}"));
    }
    if let Some(known) = NAMED_KEYS.iter().find(|k| **k == lower) {
        return Some((*known).to_string());
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| (*canonical).to_string())
}

/// Canonical identifier of a physical or virtual key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyToken {
    /// Printable key, stored as its unshifted character
    Char(char),
    /// Symbolic key such as `shift` or `f10`
    Named(String),
}

impl KeyToken {
    pub fn char(c: char) -> Self {
        KeyToken::Char(c)
    }

    pub fn named(name: impl AsRef<str>) -> Self {
        KeyToken::Named(name.as_ref().trim().to_ascii_lowercase())
    }

    /// Raw platform key code without a symbolic name
    pub fn code(code: u32) -> Self {
        KeyToken::Named(format!("{CODE_PREFIX}{code}"))
    }

    pub fn raw_code(&self) -> Option<u32> {
        match self {
            KeyToken::Named(n) => n.strip_prefix(CODE_PREFIX)?.parse().ok(),
            KeyToken::Char(_) => None,
        }
    }

    /// Same key with its name in canonical spelling, `None` if unknown
    pub fn canonical(&self) -> Option<KeyToken> {
        match self {
            KeyToken::Char(c) if c.is_control() => None,
            KeyToken::Char(c) => Some(KeyToken::Char(*c)),
            KeyToken::Named(n) => canonical_name(n).map(KeyToken::Named),
        }
    }

    pub fn is_known(&self) -> bool {
        self.canonical().is_some()
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Char(c) => write!(f, "{c}"),
            KeyToken::Named(n) => f.write_str(n),
        }
    }
}

impl FromStr for KeyToken {
    type Err = Error;

    /// One character parses as `Char` (lowercased), anything longer as a
    /// known key name
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Err(Error::InvalidHotkey(s.to_string())),
            (Some(c), None) => Ok(KeyToken::Char(c.to_ascii_lowercase())),
            _ => canonical_name(s)
                .map(KeyToken::Named)
                .ok_or_else(|| Error::InvalidHotkey(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Cmd,
}

impl Modifier {
    /// Modifier a key acts as, either side of the keyboard
    pub fn of(key: &KeyToken) -> Option<Modifier> {
        let KeyToken::Named(name) = key else {
            return None;
        };
        match canonical_name(name)?.as_str() {
            "ctrl_l" | "ctrl_r" => Some(Modifier::Ctrl),
            "shift" | "shift_r" => Some(Modifier::Shift),
            "alt" | "alt_gr" => Some(Modifier::Alt),
            "cmd" | "cmd_r" => Some(Modifier::Cmd),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modifier::Ctrl => "ctrl",
            Modifier::Shift => "shift",
            Modifier::Alt => "alt",
            Modifier::Cmd => "cmd",
        }
    }
}

/// Global key combination: a set of held modifiers plus a trigger key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hotkey {
    modifiers: BTreeSet<Modifier>,
    key: KeyToken,
}

impl Hotkey {
    pub fn new(key: KeyToken) -> Self {
        Self {
            modifiers: BTreeSet::new(),
            key,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn key(&self) -> &KeyToken {
        &self.key
    }

    pub fn modifiers(&self) -> &BTreeSet<Modifier> {
        &self.modifiers
    }

    /// True when `key` is the trigger and exactly these modifiers are held
    pub fn matches(&self, key: &KeyToken, held: &BTreeSet<Modifier>) -> bool {
        self.key == *key && self.modifiers == *held
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.name())?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for Hotkey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidHotkey(s.to_string());
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let (trigger, mods) = parts.split_last().ok_or_else(invalid)?;

        let key: KeyToken = trigger.parse().map_err(|_| invalid())?;
        if Modifier::of(&key).is_some() {
            return Err(invalid());
        }

        let mut hotkey = Hotkey::new(key);
        for m in mods {
            let modifier = Modifier::of(&KeyToken::named(m)).ok_or_else(invalid)?;
            hotkey = hotkey.with_modifier(modifier);
        }
        Ok(hotkey)
    }
}

impl TryFrom<String> for Hotkey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Hotkey> for String {
    fn from(h: Hotkey) -> String {
        h.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_names() {
        assert_eq!(canonical_name("Escape").as_deref(), Some("esc"));
        assert_eq!(canonical_name("ctrl").as_deref(), Some("ctrl_l"));
        assert_eq!(canonical_name("F10").as_deref(), Some("f10"));
        assert_eq!(canonical_name("code:0042").as_deref(), Some("code:42"));
        assert_eq!(canonical_name("hyper"), None);
    }

    #[test]
    fn single_char_name_and_char_key_stay_distinct() {
        let named = KeyToken::Named("a".into());
        let ch = KeyToken::Char('a');
        assert_ne!(named, ch);
        assert_eq!(serde_json::to_string(&ch).unwrap(), r#"{"char":"a"}"#);
        assert_eq!(serde_json::to_string(&named).unwrap(), r#"{"named":"a"}"#);
        let back: KeyToken = serde_json::from_str(r#"{"named":"a"}"#).unwrap();
        assert_eq!(back, named);
    }

    #[test]
    fn raw_codes_round_trip() {
        let k = KeyToken::code(133);
        assert_eq!(k.raw_code(), Some(133));
        assert!(k.is_known());
        assert_eq!(KeyToken::Char('x').raw_code(), None);
    }

    #[test]
    fn parses_hotkeys() {
        let h: Hotkey = "ctrl+Shift+R".parse().unwrap();
        assert_eq!(h.key(), &KeyToken::Char('r'));
        assert!(h.modifiers().contains(&Modifier::Ctrl));
        assert!(h.modifiers().contains(&Modifier::Shift));
        assert_eq!(h.to_string(), "ctrl+shift+r");

        let f: Hotkey = "F10".parse().unwrap();
        assert_eq!(f.key(), &KeyToken::named("f10"));
        assert!(f.modifiers().is_empty());
    }

    #[test]
    fn rejects_bad_hotkeys() {
        for bad in ["", "ctrl+", "hyper+a", "shift", "ctrl+notakey"] {
            assert!(bad.parse::<Hotkey>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn hotkey_serializes_as_string() {
        let h: Hotkey = "alt+f6".parse().unwrap();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, "\"alt+f6\"");
        let back: Hotkey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn modifiers_cover_both_sides() {
        assert_eq!(Modifier::of(&KeyToken::named("ctrl_r")), Some(Modifier::Ctrl));
        assert_eq!(Modifier::of(&KeyToken::named("shift_r")), Some(Modifier::Shift));
        assert_eq!(Modifier::of(&KeyToken::named("alt_gr")), Some(Modifier::Alt));
        assert_eq!(Modifier::of(&KeyToken::Char('c')), None);
    }
}
