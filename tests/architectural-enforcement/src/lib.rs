//! Architectural Enforcement Integration Tests
//!
//! This package holds source-level checks that keep the workspace honest:
//! - No sleep() calls in production code (timers wait on deadlines or intervals)
//! - No blocking HTTP clients inside the async engine
//! - No blocking file, socket or process I/O on the runtime
//!
//! The helpers here walk the production sources of every member crate. Test
//! modules (everything from the first `#[cfg(test)]` of a file on) are not
//! production code.

use std::fs;
use std::path::{Path, PathBuf};

/// Source directories holding production code, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["hud/core/src", "companion/src"];

/// Files allowed to use blocking I/O, relative to the workspace root
///
/// Configuration is read once, before any page or store work starts.
pub const BLOCKING_IO_ALLOWED: &[&str] = &["hud/core/src/config.rs"];

/// Workspace root, derived from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// One line of production source
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub path: PathBuf,
    pub number: usize,
    pub text: String,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.text.trim())
    }
}

/// Code portion of a line, with any `//` comment removed
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Lines of `content` that precede its test module
pub fn production_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| (idx + 1, line))
}

/// Every production line under [`PRODUCTION_DIRS`] for which `matches` holds
pub fn scan_production<F>(matches: F) -> Vec<SourceLine>
where
    F: Fn(&str) -> bool,
{
    let root = workspace_root();
    let mut hits = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };

            for (number, line) in production_lines(&content) {
                if matches(code_part(line)) {
                    hits.push(SourceLine {
                        path: entry.path().to_path_buf(),
                        number,
                        text: line.to_string(),
                    });
                }
            }
        }
    }

    hits
}

/// Whether `code` calls a plain `sleep(...)`
///
/// Deadline waits such as `sleep_until(` are allowed.
#[must_use]
pub fn calls_sleep(code: &str) -> bool {
    code.match_indices("sleep(").any(|(at, _)| {
        code[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
    })
}

/// Kind of blocking I/O `code` performs, if any
#[must_use]
pub fn blocking_io_kind(code: &str) -> Option<&'static str> {
    if code.contains("std::fs") {
        Some("file")
    } else if code.contains("std::net") {
        Some("network")
    } else if code.contains("std::process::Command") {
        Some("process")
    } else if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
        Some("console")
    } else {
        None
    }
}

/// Whether `path` is listed in [`BLOCKING_IO_ALLOWED`]
#[must_use]
pub fn blocking_io_allowed(path: &Path) -> bool {
    let root = workspace_root();
    let relative = path.strip_prefix(&root).unwrap_or(path);
    BLOCKING_IO_ALLOWED
        .iter()
        .any(|allowed| relative == Path::new(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_detection() {
        assert!(calls_sleep("    tokio::time::sleep(Duration::from_millis(10)).await;"));
        assert!(calls_sleep("sleep(period).await"));
        assert!(calls_sleep("std::thread::sleep(d);"));
        assert!(!calls_sleep("sleep_until(deadline).await"));
        assert!(!calls_sleep("let oversleep(x) = 1;"));
    }

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n#[cfg(test)]\nmod tests { fn b() { sleep(x); } }\n";
        let lines: Vec<_> = production_lines(source).collect();
        assert_eq!(lines, vec![(1, "fn a() {}")]);
    }

    #[test]
    fn test_comments_are_ignored() {
        assert_eq!(code_part("let x = 1; // sleep(5)"), "let x = 1; ");
    }

    #[test]
    fn test_blocking_io_detection() {
        assert_eq!(
            blocking_io_kind("    let raw = std::fs::read_to_string(&path)?;"),
            Some("file")
        );
        assert_eq!(blocking_io_kind("use std::fs;"), Some("file"));
        assert_eq!(blocking_io_kind("use std::net::TcpStream;"), Some("network"));
        assert_eq!(
            blocking_io_kind("std::process::Command::new(\"ls\")"),
            Some("process")
        );
        assert_eq!(blocking_io_kind("tokio::fs::read_to_string(&path).await"), None);
        assert_eq!(blocking_io_kind(".with_writer(std::io::stderr)"), None);
    }

    #[test]
    fn test_config_may_block() {
        let root = workspace_root();
        assert!(blocking_io_allowed(&root.join("hud/core/src/config.rs")));
        assert!(!blocking_io_allowed(&root.join("hud/core/src/progress.rs")));
    }

    #[test]
    fn test_workspace_root_contains_members() {
        assert!(workspace_root().join("hud/core/Cargo.toml").exists());
    }
}
