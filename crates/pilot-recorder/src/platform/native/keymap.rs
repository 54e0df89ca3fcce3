//! Translation between `rdev` keys and canonical key tokens

use rdev::{Button, Key};

use crate::events::MouseButton;
use crate::keys::KeyToken;

const NAMED: &[(Key, &str)] = &[
    (Key::Alt, "alt"),
    (Key::AltGr, "alt_gr"),
    (Key::Backspace, "backspace"),
    (Key::CapsLock, "caps_lock"),
    (Key::ControlLeft, "ctrl_l"),
    (Key::ControlRight, "ctrl_r"),
    (Key::Delete, "delete"),
    (Key::DownArrow, "down"),
    (Key::End, "end"),
    (Key::Escape, "esc"),
    (Key::F1, "f1"),
    (Key::F2, "f2"),
    (Key::F3, "f3"),
    (Key::F4, "f4"),
    (Key::F5, "f5"),
    (Key::F6, "f6"),
    (Key::F7, "f7"),
    (Key::F8, "f8"),
    (Key::F9, "f9"),
    (Key::F10, "f10"),
    (Key::F11, "f11"),
    (Key::F12, "f12"),
    (Key::Function, "fn"),
    (Key::Home, "home"),
    (Key::Insert, "insert"),
    (Key::LeftArrow, "left"),
    (Key::MetaLeft, "cmd"),
    (Key::MetaRight, "cmd_r"),
    (Key::NumLock, "num_lock"),
    (Key::PageDown, "page_down"),
    (Key::PageUp, "page_up"),
    (Key::Pause, "pause"),
    (Key::PrintScreen, "print_screen"),
    (Key::Return, "enter"),
    (Key::RightArrow, "right"),
    (Key::ScrollLock, "scroll_lock"),
    (Key::ShiftLeft, "shift"),
    (Key::ShiftRight, "shift_r"),
    (Key::Space, "space"),
    (Key::Tab, "tab"),
    (Key::UpArrow, "up"),
    (Key::Kp0, "kp_0"),
    (Key::Kp1, "kp_1"),
    (Key::Kp2, "kp_2"),
    (Key::Kp3, "kp_3"),
    (Key::Kp4, "kp_4"),
    (Key::Kp5, "kp_5"),
    (Key::Kp6, "kp_6"),
    (Key::Kp7, "kp_7"),
    (Key::Kp8, "kp_8"),
    (Key::Kp9, "kp_9"),
    (Key::KpReturn, "kp_enter"),
    (Key::KpMinus, "kp_minus"),
    (Key::KpPlus, "kp_plus"),
    (Key::KpMultiply, "kp_multiply"),
    (Key::KpDivide, "kp_divide"),
    (Key::KpDelete, "kp_delete"),
];

// Unshifted character of each printable key (US layout)
const CHARS: &[(Key, char)] = &[
    (Key::BackQuote, '`'),
    (Key::Num1, '1'),
    (Key::Num2, '2'),
    (Key::Num3, '3'),
    (Key::Num4, '4'),
    (Key::Num5, '5'),
    (Key::Num6, '6'),
    (Key::Num7, '7'),
    (Key::Num8, '8'),
    (Key::Num9, '9'),
    (Key::Num0, '0'),
    (Key::Minus, '-'),
    (Key::Equal, '='),
    (Key::KeyQ, 'q'),
    (Key::KeyW, 'w'),
    (Key::KeyE, 'e'),
    (Key::KeyR, 'r'),
    (Key::KeyT, 't'),
    (Key::KeyY, 'y'),
    (Key::KeyU, 'u'),
    (Key::KeyI, 'i'),
    (Key::KeyO, 'o'),
    (Key::KeyP, 'p'),
    (Key::LeftBracket, '['),
    (Key::RightBracket, ']'),
    (Key::KeyA, 'a'),
    (Key::KeyS, 's'),
    (Key::KeyD, 'd'),
    (Key::KeyF, 'f'),
    (Key::KeyG, 'g'),
    (Key::KeyH, 'h'),
    (Key::KeyJ, 'j'),
    (Key::KeyK, 'k'),
    (Key::KeyL, 'l'),
    (Key::SemiColon, ';'),
    (Key::Quote, '\''),
    (Key::BackSlash, '\\'),
    (Key::IntlBackslash, '<'),
    (Key::KeyZ, 'z'),
    (Key::KeyX, 'x'),
    (Key::KeyC, 'c'),
    (Key::KeyV, 'v'),
    (Key::KeyB, 'b'),
    (Key::KeyN, 'n'),
    (Key::KeyM, 'm'),
    (Key::Comma, ','),
    (Key::Dot, '.'),
    (Key::Slash, '/'),
];

pub fn token_from_key(key: Key) -> KeyToken {
    if let Key::Unknown(code) = key {
        return KeyToken::code(code);
    }
    if let Some((_, c)) = CHARS.iter().find(|(k, _)| *k == key) {
        return KeyToken::Char(*c);
    }
    match NAMED.iter().find(|(k, _)| *k == key) {
        Some((_, name)) => KeyToken::named(name),
        None => KeyToken::named(format!("{key:?}")),
    }
}

/// `None` when no physical key produces the token
pub fn key_from_token(token: &KeyToken) -> Option<Key> {
    match token.canonical()? {
        KeyToken::Char(' ') => Some(Key::Space),
        KeyToken::Char(c) => {
            let c = c.to_ascii_lowercase();
            CHARS.iter().find(|(_, ch)| *ch == c).map(|(k, _)| *k)
        }
        KeyToken::Named(name) => {
            if let Some(code) = token.raw_code() {
                return Some(Key::Unknown(code));
            }
            NAMED.iter().find(|(_, n)| *n == name).map(|(k, _)| *k)
        }
    }
}

pub fn button_from_rdev(button: Button) -> Option<MouseButton> {
    match button {
        Button::Left => Some(MouseButton::Left),
        Button::Right => Some(MouseButton::Right),
        Button::Middle => Some(MouseButton::Middle),
        Button::Unknown(_) => None,
    }
}

pub fn button_to_rdev(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
    }
}
