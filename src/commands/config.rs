//! Configuration file editor command.

use std::process::Command;

use crate::config::{config_path, BeatbarsConfig};

/// Opens the configuration file in the user's preferred editor.
///
/// Writes the default configuration first if none exists. Tries `$EDITOR`, then
/// nano, then vi.
///
/// # Errors
/// - If the config file cannot be created
/// - If no editor can be found or the editor fails
pub fn handle_config() -> anyhow::Result<()> {
    let path = config_path()?;
    if !path.exists() {
        BeatbarsConfig::default().save()?;
    }

    tracing::info!("Opening config file: {}", path.display());

    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

    let status = Command::new(&editor).arg(&path).status().map_err(|e| {
        anyhow::anyhow!(
            "Failed to open editor '{editor}': {e}. Make sure the editor is installed and accessible."
        )
    })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    // Catch mistakes now rather than at the next play.
    let content = std::fs::read_to_string(&path)?;
    match BeatbarsConfig::from_toml(&content).and_then(|c| c.validate()) {
        Ok(()) => tracing::info!("Config file edited successfully"),
        Err(e) => {
            tracing::warn!("Edited config is invalid: {e}");
            eprintln!("Warning: {e}");
        }
    }
    Ok(())
}

fn find_editor() -> anyhow::Result<String> {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    ["nano", "vi"]
        .into_iter()
        .find(|editor| is_editor_available(editor))
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No editor found. Please set the $EDITOR environment variable."))
}

fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
