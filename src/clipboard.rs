//! Clipboard integration for the "copy CLI command" control
//!
//! Uses arboard for cross-platform clipboard access

use anyhow::Result;
use arboard::Clipboard;

/// Copy text to system clipboard
pub fn copy(text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(()); // Nothing to copy
    }

    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text.to_string())?;
    tracing::debug!("Copied {} bytes to clipboard", text.len());
    Ok(())
}

/// Copy a console command, reporting whether the clipboard took it.
/// Headless sessions have no clipboard; that is logged, not fatal.
pub fn copy_command(command: &str) -> bool {
    match copy(command) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Clipboard unavailable: {}", e);
            false
        }
    }
}
