//! Keyboard input and the per-display key bindings.

use log::trace;

/// A key press, named the way browsers report `KeyboardEvent.key`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    PageUp,
    PageDown,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    F5,
}

impl Key {
    /// Parses a key name (`PageUp`, `Enter`, `F5`, `space`, a single character...).
    /// Named keys are matched case-insensitively.
    pub fn parse(name: &str) -> Option<Key> {
        if name == " " {
            return Some(Key::Char(' '));
        }
        let name = name.trim();
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(c));
        }
        let key = match name.to_ascii_lowercase().as_str() {
            "enter" | "return" => Key::Enter,
            "escape" | "esc" => Key::Escape,
            "backspace" | "delete" | "del" => Key::Backspace,
            "pageup" | "pgup" => Key::PageUp,
            "pagedown" | "pgdn" => Key::PageDown,
            "arrowleft" | "left" => Key::ArrowLeft,
            "arrowright" | "right" => Key::ArrowRight,
            "arrowup" | "up" => Key::ArrowUp,
            "arrowdown" | "down" => Key::ArrowDown,
            "space" | "spacebar" => Key::Char(' '),
            "f5" => Key::F5,
            _ => {
                trace!("Unknown key name '{}'", name);
                return None;
            }
        };
        Some(key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PpvAction {
    Next,
    Previous,
    Confirm,
    TogglePause,
}

/// PageUp/PageDown page through the catalog, Enter orders, `p` pauses.
pub fn ppv_action(key: Key) -> Option<PpvAction> {
    match key {
        Key::PageUp => Some(PpvAction::Next),
        Key::PageDown => Some(PpvAction::Previous),
        Key::Enter => Some(PpvAction::Confirm),
        Key::Char('p') | Key::Char('P') => Some(PpvAction::TogglePause),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticsAction {
    Next,
    Previous,
    Refresh,
    TogglePause,
}

pub fn diagnostics_action(key: Key) -> Option<DiagnosticsAction> {
    match key {
        Key::ArrowRight | Key::Char(' ') | Key::Char('n') => Some(DiagnosticsAction::Next),
        Key::ArrowLeft | Key::Char('p') => Some(DiagnosticsAction::Previous),
        Key::Char('r') | Key::F5 => Some(DiagnosticsAction::Refresh),
        Key::Escape => Some(DiagnosticsAction::TogglePause),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteAction {
    Digit(char),
    Commit,
    Clear,
    ChannelUp,
    ChannelDown,
}

pub fn remote_action(key: Key) -> Option<RemoteAction> {
    match key {
        Key::Char(c) if c.is_ascii_digit() => Some(RemoteAction::Digit(c)),
        Key::Enter => Some(RemoteAction::Commit),
        Key::Escape | Key::Backspace => Some(RemoteAction::Clear),
        Key::ArrowUp | Key::PageUp => Some(RemoteAction::ChannelUp),
        Key::ArrowDown | Key::PageDown => Some(RemoteAction::ChannelDown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_and_single_character_keys() {
        assert_eq!(Key::parse("PageUp"), Some(Key::PageUp));
        assert_eq!(Key::parse("pagedown"), Some(Key::PageDown));
        assert_eq!(Key::parse("space"), Some(Key::Char(' ')));
        assert_eq!(Key::parse(" "), Some(Key::Char(' ')));
        assert_eq!(Key::parse("P"), Some(Key::Char('P')));
        assert_eq!(Key::parse("7\n"), Some(Key::Char('7')));
        assert_eq!(Key::parse("F5"), Some(Key::F5));
        assert_eq!(Key::parse("Hyper"), None);
        assert_eq!(Key::parse(""), None);
    }

    #[test]
    fn bindings_differ_per_display() {
        assert_eq!(ppv_action(Key::Char('p')), Some(PpvAction::TogglePause));
        assert_eq!(diagnostics_action(Key::Char('p')), Some(DiagnosticsAction::Previous));
        assert_eq!(diagnostics_action(Key::Escape), Some(DiagnosticsAction::TogglePause));
        assert_eq!(ppv_action(Key::ArrowRight), None);
        assert_eq!(remote_action(Key::Char('4')), Some(RemoteAction::Digit('4')));
        assert_eq!(remote_action(Key::Char('x')), None);
    }
}
