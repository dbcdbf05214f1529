//! # File Operations
//!
//! Read, list and write inside the confinement root. Every operation resolves its
//! path through the [`PathGuard`] first and reports failures as [`ToolResult::Error`].

use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::domain::types::ToolResult;
use crate::infrastructure::tools::attribution;
use crate::infrastructure::tools::path_guard::PathGuard;
use crate::strings::messages;

/// Reads at most `max_chars` characters of a regular file. Longer files are
/// truncated silently.
pub async fn read_file(guard: &PathGuard, file_path: &str, max_chars: usize) -> ToolResult {
    let target = match guard.resolve(file_path) {
        Ok(path) => path,
        Err(rejected) => {
            tracing::warn!("Blocked read: {}", rejected);
            return ToolResult::error(messages::outside_root("read", file_path));
        }
    };

    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_file() => {}
        _ => return ToolResult::error(messages::not_a_regular_file(file_path)),
    }

    match read_prefix(&target, max_chars).await {
        Ok(text) => ToolResult::ok(text),
        Err(e) => ToolResult::error(messages::read_failed(file_path, &e.to_string())),
    }
}

async fn read_prefix(path: &Path, max_chars: usize) -> io::Result<String> {
    // A UTF-8 char is at most four bytes, so this many bytes always covers `max_chars`.
    let limit = (max_chars as u64).saturating_mul(4);
    let file = tokio::fs::File::open(path).await?;
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).await?;
    let hit_limit = bytes.len() as u64 == limit;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        // The byte cap may split the final character; drop the partial tail.
        Err(e) if hit_limit && e.utf8_error().error_len().is_none() => {
            let valid = e.utf8_error().valid_up_to();
            let mut bytes = e.into_bytes();
            bytes.truncate(valid);
            String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        }
        Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
    };

    let cut = text.char_indices().nth(max_chars).map(|(index, _)| index);
    Ok(match cut {
        Some(index) => text[..index].to_string(),
        None => text,
    })
}

/// Lists the direct children of a directory, one line per entry.
///
/// Entries are sorted by name so the listing is reproducible across filesystems.
pub async fn list_directory(guard: &PathGuard, directory: &str) -> ToolResult {
    let target = match guard.resolve(directory) {
        Ok(path) => path,
        Err(rejected) => {
            tracing::warn!("Blocked listing: {}", rejected);
            return ToolResult::error(messages::outside_root("list", directory));
        }
    };

    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => {}
        _ => return ToolResult::error(messages::not_a_directory(directory)),
    }

    match collect_entries(&target).await {
        Ok(mut entries) => {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let lines: Vec<String> = entries
                .iter()
                .map(|(name, size, is_dir)| messages::directory_entry(name, *size, *is_dir))
                .collect();
            ToolResult::ok(lines.join("\n"))
        }
        Err(e) => ToolResult::error(messages::list_failed(directory, &e.to_string())),
    }
}

async fn collect_entries(dir: &Path) -> io::Result<Vec<(String, u64, bool)>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        // Follow symlinks for size and kind; a dangling link reports itself.
        let meta = match tokio::fs::metadata(entry.path()).await {
            Ok(meta) => meta,
            Err(_) => entry.metadata().await?,
        };
        entries.push((name, meta.len(), meta.is_dir()));
    }
    Ok(entries)
}

/// Writes `content` to a file, creating missing parent directories and
/// overwriting any existing file.
pub async fn write_file(
    guard: &PathGuard,
    file_path: &str,
    content: &str,
    attribute: bool,
) -> ToolResult {
    let target = match guard.resolve(file_path) {
        Ok(path) => path,
        Err(rejected) => {
            tracing::warn!("Blocked write: {}", rejected);
            return ToolResult::error(messages::outside_root("write to", file_path));
        }
    };

    let existing = tokio::fs::metadata(&target).await.ok();
    if existing.as_ref().is_some_and(|meta| meta.is_dir()) {
        return ToolResult::error(messages::target_is_directory(file_path));
    }

    if let Some(parent) = target.parent()
        && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
        return ToolResult::error(messages::create_directory_failed(file_path, &e.to_string()));
    }

    let (final_content, success) = if attribute {
        let previous = match existing {
            Some(_) => tokio::fs::read_to_string(&target).await.ok(),
            None => None,
        };
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let attributed = attribution::annotate(file_path, previous.as_deref(), content, &timestamp);
        let message = messages::write_attributed(
            file_path,
            attributed.created,
            attributed.content.chars().count(),
            attributed.lines,
            attributed.delta,
        );
        (attributed.content, message)
    } else {
        let message = messages::write_succeeded(file_path, content.chars().count());
        (content.to_string(), message)
    };

    match tokio::fs::write(&target, final_content).await {
        Ok(()) => {
            tracing::debug!("Wrote {}", target.display());
            ToolResult::ok(success)
        }
        Err(e) => ToolResult::error(describe_write_error(file_path, &e)),
    }
}

fn describe_write_error(file_path: &str, err: &io::Error) -> String {
    if err.kind() == io::ErrorKind::PermissionDenied {
        messages::write_permission_denied(file_path)
    } else if err.raw_os_error().is_some() {
        messages::write_filesystem_error(file_path, &err.to_string())
    } else {
        messages::write_failed(file_path, &err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, PathGuard) {
        let dir = TempDir::new().unwrap();
        let guard = PathGuard::new(dir.path()).unwrap();
        (dir, guard)
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let (_dir, guard) = sandbox();
        let content = "print('hello')\n# ünïcödé\n";

        let written = write_file(&guard, "main.py", content, false).await;
        assert_eq!(
            written,
            ToolResult::ok(messages::write_succeeded("main.py", content.chars().count()))
        );
        assert_eq!(read_file(&guard, "main.py", 10_000).await, ToolResult::ok(content));

        // Overwrite an existing file.
        write_file(&guard, "main.py", "x = 1", false).await;
        assert_eq!(read_file(&guard, "main.py", 10_000).await, ToolResult::ok("x = 1"));
    }

    #[tokio::test]
    async fn test_write_creates_missing_parents() {
        let (dir, guard) = sandbox();
        let result = write_file(&guard, "pkg/deep/nested/module.py", "pass", false).await;
        assert!(!result.is_error(), "{:?}", result);
        assert!(dir.path().join("pkg/deep/nested/module.py").is_file());
    }

    #[tokio::test]
    async fn test_write_to_directory_fails() {
        let (dir, guard) = sandbox();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        assert_eq!(
            write_file(&guard, "pkg", "oops", false).await,
            ToolResult::error(messages::target_is_directory("pkg"))
        );
    }

    #[tokio::test]
    async fn test_write_outside_root_is_rejected() {
        let (_dir, guard) = sandbox();
        let result = write_file(&guard, "../escape.txt", "x", false).await;
        assert_eq!(result, ToolResult::error(messages::outside_root("write to", "../escape.txt")));
    }

    #[test]
    fn test_write_error_classes() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(describe_write_error("a.py", &denied), messages::write_permission_denied("a.py"));

        // ENOSPC
        let full = io::Error::from_raw_os_error(28);
        assert_eq!(
            describe_write_error("a.py", &full),
            messages::write_filesystem_error("a.py", &full.to_string())
        );

        let other = io::Error::other("stream closed");
        assert_eq!(
            describe_write_error("a.py", &other),
            messages::write_failed("a.py", "stream closed")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_into_read_only_directory() {
        use std::os::unix::fs::PermissionsExt;

        // Root ignores directory permissions.
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let (dir, guard) = sandbox();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let result = write_file(&guard, "locked/out.txt", "x", false).await;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result, ToolResult::error(messages::write_permission_denied("locked/out.txt")));
        assert!(!locked.join("out.txt").exists());
    }

    #[tokio::test]
    async fn test_read_truncates_to_max_chars() {
        let (dir, guard) = sandbox();
        fs::write(dir.path().join("big.txt"), "é".repeat(50)).unwrap();
        assert_eq!(read_file(&guard, "big.txt", 7).await, ToolResult::ok("é".repeat(7)));
    }

    #[tokio::test]
    async fn test_read_rejects_directories_and_missing_files() {
        let (dir, guard) = sandbox();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        assert_eq!(
            read_file(&guard, "pkg", 100).await,
            ToolResult::error(messages::not_a_regular_file("pkg"))
        );
        assert_eq!(
            read_file(&guard, "missing.py", 100).await,
            ToolResult::error(messages::not_a_regular_file("missing.py"))
        );
        assert!(read_file(&guard, "/etc/passwd", 100).await.is_error());
    }

    #[tokio::test]
    async fn test_read_invalid_utf8_is_reported() {
        let (dir, guard) = sandbox();
        fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();
        let result = read_file(&guard, "blob.bin", 100).await;
        assert!(result.is_error());
        assert!(result.text().starts_with("Failed to read \"blob.bin\""));
    }

    #[tokio::test]
    async fn test_list_reports_one_line_per_entry() {
        let (dir, guard) = sandbox();
        fs::write(dir.path().join("main.py"), "12345").unwrap();
        fs::write(dir.path().join("tests.py"), "").unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();

        let result = list_directory(&guard, ".").await;
        let text = match &result {
            ToolResult::Ok(text) => text.clone(),
            ToolResult::Error(e) => panic!("listing failed: {e}"),
        };
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "- main.py: file_size=5 bytes, is_dir=false");
        assert!(lines[1].starts_with("- pkg: file_size="));
        assert!(lines[1].ends_with("is_dir=true"));
        assert_eq!(lines[2], "- tests.py: file_size=0 bytes, is_dir=false");
    }

    #[tokio::test]
    async fn test_list_rejects_files_and_escapes() {
        let (dir, guard) = sandbox();
        fs::write(dir.path().join("main.py"), "").unwrap();
        assert_eq!(
            list_directory(&guard, "main.py").await,
            ToolResult::error(messages::not_a_directory("main.py"))
        );
        assert_eq!(
            list_directory(&guard, "../").await,
            ToolResult::error(messages::outside_root("list", "../"))
        );
        assert_eq!(
            list_directory(&guard, "/bin").await,
            ToolResult::error(messages::outside_root("list", "/bin"))
        );
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let (_dir, guard) = sandbox();
        assert_eq!(list_directory(&guard, "").await, ToolResult::ok(""));
    }
}
