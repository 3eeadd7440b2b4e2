use std::fs;

use checkin_recovery::{ReportConfig, RecoveryError, build_report};
use tempfile::tempdir;

const TRACE: &str = "\
[2025-02-14 09:30:12] [INFO] Starting API call for Purdue ID: 0011111111
[2025-02-14 09:30:14] [INFO] Logged check-in for user: 11111111 (Visit #1)
[2025-02-14 09:31:00] [INFO] Starting API call for Purdue ID: 2222222201
[2025-02-14 09:32:00] [WARN] Lookup failed for user: 33333333
[2025-02-14 09:33:00] [INFO] Starting API call for Purdue ID: 1234
";

#[test]
fn reports_trace_accounts_missing_from_store() {
    let temp = tempdir().unwrap();
    let config = ReportConfig {
        debug_log: temp.path().join("debug.log"),
        checkin_log: temp.path().join("checkin_log.csv"),
    };
    fs::write(&config.debug_log, TRACE).unwrap();
    fs::write(
        &config.checkin_log,
        "0022222222,2025-02-14 09:31:05,Student\n\
         33333333,2025-02-14 09:32:10,Faculty,4\n\
         UNKNOWN,2025-02-14 09:40:00,\n",
    )
    .unwrap();

    let report = build_report(&config).unwrap();

    let missing: Vec<&str> = report.missing.iter().map(|m| m.account.as_str()).collect();
    assert_eq!(missing, vec!["11111111"]);
    assert_eq!(report.trace_unique, 3);
    assert_eq!(report.store_unique, 2);
    assert_eq!(
        report.missing[0].first_seen.timestamp.as_deref(),
        Some("2025-02-14 09:30:12")
    );

    let mut out = Vec::new();
    report.write_text(&config, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Found 1 IDs in debug.log that are missing from checkin_log.csv:"));
    assert!(text.contains("Missing ID: 11111111"));
    assert!(text.contains("Timestamp: 2025-02-14 09:30:12"));
}

#[test]
fn both_inputs_are_required() {
    let temp = tempdir().unwrap();
    let config = ReportConfig {
        debug_log: temp.path().join("debug.log"),
        checkin_log: temp.path().join("checkin_log.csv"),
    };
    fs::write(&config.debug_log, TRACE).unwrap();

    match build_report(&config) {
        Err(RecoveryError::InputMissing { path }) => assert_eq!(path, config.checkin_log),
        other => panic!("unexpected result: {other:?}"),
    }
}
