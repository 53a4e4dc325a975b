//! Cursor-based incremental potfile reading.

use std::path::Path;

use crackd_core::Result;

/// Reads the potfile lines past `from_cursor`.
///
/// Returns the new lines and the updated cursor (total line count). A
/// missing potfile is not an error: the engine simply has not cracked
/// anything yet, so the result is empty and the cursor is unchanged.
pub async fn read_from(path: &Path, from_cursor: u64) -> Result<(Vec<String>, u64)> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok((Vec::new(), from_cursor));
        }
        Err(err) => return Err(err.into()),
    };

    let mut cursor = 0u64;
    let mut new_lines = Vec::new();
    for line in content.lines() {
        cursor += 1;
        if cursor > from_cursor && !line.is_empty() {
            new_lines.push(line.to_string());
        }
    }

    // A truncated potfile must not move the cursor backwards.
    Ok((new_lines, cursor.max(from_cursor)))
}
