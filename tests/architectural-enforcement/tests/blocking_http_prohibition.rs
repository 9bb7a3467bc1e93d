//! Integration Test: Blocking HTTP Prohibition
//!
//! **Policy**: archive and image requests run on the tokio runtime, so the
//! blocking `reqwest` client and `std::net` sockets are off limits.

use architectural_enforcement::scan_production;

#[test]
fn test_no_blocking_http_in_production_code() {
    let violations = scan_production(|code| {
        code.contains("reqwest::blocking") || code.contains("std::net::TcpStream")
    });

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking network calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED: reqwest::Client with .await");

        panic!(
            "\nFound {} blocking network violation(s) in production code.",
            violations.len()
        );
    }
}
