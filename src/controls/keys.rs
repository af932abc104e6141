//! Key codes understood by the native engine and the catalog used when binding
//! a new on-screen button.
//!
//! Codes follow the Android `KeyEvent.KEYCODE_*` numbering, which is what the
//! native side receives through its key-down/key-up entry points.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Platform key code forwarded to the native engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const A: KeyCode = KeyCode(29);
    pub const D: KeyCode = KeyCode(32);
    pub const E: KeyCode = KeyCode(33);
    pub const S: KeyCode = KeyCode(47);
    pub const W: KeyCode = KeyCode(51);
    pub const Z: KeyCode = KeyCode(54);
    pub const SHIFT_LEFT: KeyCode = KeyCode(59);
    pub const SHIFT_RIGHT: KeyCode = KeyCode(60);
    pub const SPACE: KeyCode = KeyCode(62);
    pub const ENTER: KeyCode = KeyCode(66);
    pub const GRAVE: KeyCode = KeyCode(68);
    pub const ESCAPE: KeyCode = KeyCode(111);
    pub const CTRL_LEFT: KeyCode = KeyCode(113);
    pub const CTRL_RIGHT: KeyCode = KeyCode(114);
    pub const F1: KeyCode = KeyCode(131);
    pub const F12: KeyCode = KeyCode(142);

    /// Key code for an ASCII letter, case-insensitive.
    pub fn letter(c: char) -> Option<KeyCode> {
        let upper = c.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Some(KeyCode(Self::A.0 + (upper as u32 - 'A' as u32)))
        } else {
            None
        }
    }

    pub fn is_letter(self) -> bool {
        (Self::A.0..=Self::A.0 + 25).contains(&self.0)
    }

    pub fn is_function_key(self) -> bool {
        (Self::F1.0..=Self::F12.0).contains(&self.0)
    }

    /// Shift keys latch on one tap and release on the next instead of pulsing.
    pub fn is_toggle(self) -> bool {
        self == Self::SHIFT_LEFT || self == Self::SHIFT_RIGHT
    }

    /// Short label shown on a bound button.
    pub fn label(self) -> String {
        match self {
            k if k.is_function_key() => format!("F{}", k.0 - Self::F1.0 + 1),
            Self::SHIFT_LEFT => "Shift-L".to_string(),
            Self::SHIFT_RIGHT => "Shift-R".to_string(),
            Self::CTRL_LEFT => "Ctrl-L".to_string(),
            Self::CTRL_RIGHT => "Ctrl-R".to_string(),
            Self::SPACE => "Space".to_string(),
            Self::ESCAPE => "Escape".to_string(),
            Self::ENTER => "Enter".to_string(),
            Self::GRAVE => "Grave".to_string(),
            k if k.is_letter() => {
                char::from_u32('A' as u32 + (k.0 - Self::A.0))
                    .map(String::from)
                    .unwrap_or_else(|| k.0.to_string())
            }
            k => k.0.to_string(),
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.0)
    }
}

/// Forward, left, back, right. Owned by the thumbstick and never offered for buttons.
pub const MOVEMENT_KEYS: [KeyCode; 4] = [KeyCode::W, KeyCode::A, KeyCode::S, KeyCode::D];

/// Modifier and special keys offered in their own group.
pub const UNIQUE_KEYS: [KeyCode; 8] = [
    KeyCode::SHIFT_LEFT,
    KeyCode::SHIFT_RIGHT,
    KeyCode::CTRL_LEFT,
    KeyCode::CTRL_RIGHT,
    KeyCode::SPACE,
    KeyCode::ESCAPE,
    KeyCode::ENTER,
    KeyCode::GRAVE,
];

/// Candidate keys for a new button, split into the three groups of the picker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyCatalog {
    pub letters: Vec<KeyCode>,
    pub function_keys: Vec<KeyCode>,
    pub unique_keys: Vec<KeyCode>,
}

impl KeyCatalog {
    /// Builds the catalog, leaving out `used` and the movement keys.
    pub fn available(used: &HashSet<KeyCode>) -> Self {
        let free = |key: &KeyCode| !used.contains(key) && !MOVEMENT_KEYS.contains(key);

        let letters = ('A'..='Z')
            .filter_map(KeyCode::letter)
            .filter(free)
            .collect();
        let function_keys = (KeyCode::F1.0..=KeyCode::F12.0)
            .map(KeyCode)
            .filter(free)
            .collect();
        let unique_keys = UNIQUE_KEYS.iter().copied().filter(free).collect();

        Self {
            letters,
            function_keys,
            unique_keys,
        }
    }

    pub fn contains(&self, key: KeyCode) -> bool {
        self.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.letters
            .iter()
            .chain(self.function_keys.iter())
            .chain(self.unique_keys.iter())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.letters.len() + self.function_keys.len() + self.unique_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keys a new button may still be bound to.
pub fn available_keys(used: &HashSet<KeyCode>) -> KeyCatalog {
    KeyCatalog::available(used)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_usage_offers_everything_but_movement() {
        let catalog = available_keys(&HashSet::new());

        assert_eq!(catalog.letters.len(), 22);
        assert_eq!(catalog.function_keys.len(), 12);
        assert_eq!(catalog.unique_keys.len(), 8);
        for key in MOVEMENT_KEYS {
            assert!(!catalog.contains(key), "{key} must stay reserved");
        }
    }

    #[test]
    fn used_keys_are_excluded_from_every_group() {
        let used: HashSet<KeyCode> = [KeyCode::E, KeyCode::F1, KeyCode::SPACE, KeyCode::W]
            .into_iter()
            .collect();
        let catalog = available_keys(&used);

        assert!(!catalog.contains(KeyCode::E));
        assert!(!catalog.contains(KeyCode::F1));
        assert!(!catalog.contains(KeyCode::SPACE));
        assert_eq!(catalog.function_keys.first(), Some(&KeyCode(132)));
        assert_eq!(catalog.unique_keys.len(), 7);
        assert_eq!(catalog.letters.len(), 21);
    }

    #[test]
    fn groups_are_disjoint() {
        let catalog = available_keys(&HashSet::new());
        let all: HashSet<KeyCode> = catalog.iter().collect();
        assert_eq!(all.len(), catalog.len());
    }

    #[test]
    fn labels_match_picker_text() {
        assert_eq!(KeyCode::letter('q').map(KeyCode::label).as_deref(), Some("Q"));
        assert_eq!(KeyCode::F12.label(), "F12");
        assert_eq!(KeyCode(135).label(), "F5");
        assert_eq!(KeyCode::SHIFT_RIGHT.label(), "Shift-R");
        assert_eq!(KeyCode::GRAVE.label(), "Grave");
        assert_eq!(KeyCode(3).label(), "3");
        assert_eq!(KeyCode::letter('1'), None);
    }

    #[test]
    fn only_shift_keys_toggle() {
        assert!(KeyCode::SHIFT_LEFT.is_toggle());
        assert!(KeyCode::SHIFT_RIGHT.is_toggle());
        assert!(!KeyCode::CTRL_LEFT.is_toggle());
        assert!(!KeyCode::SPACE.is_toggle());
    }
}
