//! Object key generation.

use uuid::Uuid;

/// Longest extension kept in a key, dot excluded. Longer ones are dropped.
pub const MAX_EXTENSION_LEN: usize = 16;

/// Generate a storage key for a new blob.
///
/// Format: `{uuid_v4}{extension}`, where the extension is taken from the last
/// `.` of the file's base name and sanitized. Extensions longer than
/// [`MAX_EXTENSION_LEN`] are dropped, so a key is at most 53 bytes.
/// Uniqueness is probabilistic; no lookup against the store is made.
#[must_use]
pub fn generate_object_key(filename: Option<&str>) -> String {
    let token = Uuid::new_v4();
    match filename.and_then(extension_of) {
        Some(ext) => format!("{token}{ext}"),
        None => token.to_string(),
    }
}

/// Extension of the base name, dot included. `None` when absent, empty, or
/// too long.
fn extension_of(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let dot = base.rfind('.')?;
    let ext = sanitize_key_part(&base[dot..]);
    (ext.len() > 1 && ext.len() <= MAX_EXTENSION_LEN + 1).then_some(ext)
}

/// Replaces everything but ASCII alphanumerics, dots, hyphens and underscores.
fn sanitize_key_part(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
