//! Platform-specific key bindings

use crossterm::event::KeyModifiers;

/// Modifier for form shortcuts
/// - macOS: SUPER (Cmd key), Ctrl also accepted
/// - Linux/Windows: CONTROL (Ctrl key)
#[cfg(target_os = "macos")]
pub const SHORTCUT_MODIFIER: KeyModifiers = KeyModifiers::SUPER;

#[cfg(not(target_os = "macos"))]
pub const SHORTCUT_MODIFIER: KeyModifiers = KeyModifiers::CONTROL;

/// Submit shortcut display
#[cfg(target_os = "macos")]
pub const SUBMIT_SHORTCUT: &str = "Cmd+S";

#[cfg(not(target_os = "macos"))]
pub const SUBMIT_SHORTCUT: &str = "Ctrl+S";

/// Clear-field shortcut display
#[cfg(target_os = "macos")]
pub const CLEAR_SHORTCUT: &str = "Cmd+D";

#[cfg(not(target_os = "macos"))]
pub const CLEAR_SHORTCUT: &str = "Ctrl+D";

/// Whether `modifiers` carry the shortcut modifier. Ctrl is accepted on
/// every platform.
pub fn is_shortcut(modifiers: KeyModifiers) -> bool {
    modifiers.contains(SHORTCUT_MODIFIER) || modifiers.contains(KeyModifiers::CONTROL)
}
