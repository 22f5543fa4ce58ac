//! File extension normalization.
//!
//! The convention used across the scanner, tree builder and ignore rules:
//! extensions are lowercase and keep their leading dot. A dot-leading name
//! with no further dot (`.env`, `.gitignore`) counts as its own extension,
//! while a name without any dot, or ending in a bare trailing dot
//! (`Makefile`, `file.`), is extensionless.

/// Returns the normalized extension of a file name, or `None` for
/// extensionless names.
pub fn normalized_extension(file_name: &str) -> Option<String> {
    match file_name.rfind('.') {
        None => None,
        // A bare trailing dot carries no extension.
        Some(idx) if idx == file_name.len() - 1 => None,
        // Dotfiles like `.env` are their own extension.
        Some(0) => Some(file_name.to_lowercase()),
        Some(idx) => Some(file_name[idx..].to_lowercase()),
    }
}

/// Convenience predicate for the extensionless-files ignore option.
pub fn is_extensionless(file_name: &str) -> bool {
    normalized_extension(file_name).is_none()
}

/// Normalizes a user-supplied allow-list entry (`rs`, `.RS`, `*.rs` are all
/// accepted in UI input) into the canonical dot-prefixed lowercase form.
pub fn normalize_allowlist_entry(entry: &str) -> String {
    let trimmed = entry.trim().trim_start_matches('*');
    if trimmed.starts_with('.') {
        trimmed.to_lowercase()
    } else {
        format!(".{}", trimmed.to_lowercase())
    }
}
