//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: the page manager, reader and progress store all run on the
//! tokio runtime. Blocking file, socket, process or console I/O there stalls
//! every other task on the worker, so production code goes through
//! `tokio::fs`, `tokio::net`, `tokio::process` and `tokio::io` instead.
//!
//! **Exception**: files in `BLOCKING_IO_ALLOWED` (configuration, read once at
//! startup).

use architectural_enforcement::{blocking_io_allowed, blocking_io_kind, scan_production};

#[test]
fn test_no_blocking_io_in_production_code() {
    let violations: Vec<_> = scan_production(|code| blocking_io_kind(code).is_some())
        .into_iter()
        .filter(|hit| !blocking_io_allowed(&hit.path))
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking I/O found in production code!\n");
        for violation in &violations {
            let kind = blocking_io_kind(&violation.text).unwrap_or("blocking");
            eprintln!("  ❌ [{kind}] {violation}");
        }
        eprintln!("\n✅ REQUIRED: tokio::fs / tokio::net / tokio::process with .await");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_progress_store_uses_async_file_io() {
    let progress = architectural_enforcement::workspace_root().join("hud/core/src/progress.rs");
    let content = std::fs::read_to_string(&progress).unwrap();

    assert!(content.contains("tokio::fs::read_to_string"));
    assert!(content.contains("tokio::fs::rename"));
}
