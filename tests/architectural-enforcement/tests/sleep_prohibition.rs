//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code in the HUD engine and the companion MUST NOT
//! call sleep. Timers wait on a deadline (`sleep_until`) or tick an
//! `interval`; tests may sleep freely, usually on paused time.

use architectural_enforcement::{calls_sleep, scan_production};

#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan_production(calls_sleep);

    if !violations.is_empty() {
        eprintln!("\n❌ Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE:");
        eprintln!("  - tokio::time::sleep_until(deadline) for debounce/throttle windows");
        eprintln!("  - tokio::time::interval() for periodic tasks");
        eprintln!("  - Test code (#[cfg(test)] modules, tests/ directories)");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}
