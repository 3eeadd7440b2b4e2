use std::fs;
use std::path::Path;

use checkin_recovery::{CheckinLog, PendingPolicy, RecoveryConfig, RecoveryError, recover_file};
use tempfile::tempdir;

const TRACE: &str = r#"[2025-02-14 09:31:00] [INFO] Starting API call for Purdue ID: 0012345678
[2025-02-14 09:31:00] [DEBUG] GET Response: <?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<user>
  <primary_id>12345678</primary_id>
  <user_group desc="Student">Student</user_group>
</user>
[2025-02-14 09:31:00] [DEBUG] PUT Request URL: https://api.example.edu/almaws/v1/users/12345678?op=update
[2025-02-14 09:31:00] [INFO] Logged check-in for user: 12345678 (Visit #3)
[2025-02-14 09:31:00] [INFO] Starting API call for Purdue ID: 12345678
[2025-02-14 09:31:00] [DEBUG] GET Response: <?xml version="1.0"?><user><user_group>Student</user_group></user>
[2025-02-14 09:31:00] [DEBUG] PUT Request URL: https://api.example.edu/almaws/v1/users/12345678?op=update
[2025-02-14 09:31:00] [INFO] Logged check-in for user: 12345678 (Visit #3)
[2025-02-14 09:32:00] [INFO] Starting API call for Purdue ID: 23456789
[2025-02-14 09:32:00] [DEBUG] GET Response: <?xml version="1.0"?><user><user_group>Faculty</user_group></user>
[2025-02-14 09:32:01] [INFO] Starting API call for Purdue ID: 45678923
[2025-02-14 09:32:01] [DEBUG] GET Response: <?xml version="1.0"?><user><user_group>Staff</user_group></user>
[2025-02-14 09:32:02] [DEBUG] PUT Request URL: https://api.example.edu/almaws/v1/users/23456789?op=update
[2025-02-14 09:32:02] [INFO] Logged check-in for user: 23456789 (Visit #1)
[2025-02-14 09:32:03] [DEBUG] PUT Request URL: https://api.example.edu/almaws/v1/users/45678923?op=update
[2025-02-14 09:32:03] [INFO] Logged check-in for user: 45678923 (Visit #7)
[2025-02-14 09:40:00] [INFO] Starting API call for Purdue ID: 34567891
[2025-02-14 09:40:00] [DEBUG] GET Response: <?xml version="1.0"?><user><user_group>Student</user_group></user>
[2025-02-14 09:40:01] [DEBUG] PUT Request URL: https://api.example.edu/almaws/v1/users/34567891?op=update
[2025-02-14 09:41:30] [INFO] Logged check-in for user: 34567891 (Visit #2)
"#;

const EXPECTED_ROWS: &str = "\
12345678,2025-02-14 09:31:00,Student,3
23456789,2025-02-14 09:32:00,Faculty,1
45678923,2025-02-14 09:32:01,Staff,7
";

fn write_trace(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("debug.log");
    fs::write(&path, TRACE).unwrap();
    path
}

#[test]
fn recovers_interleaved_transactions_and_drops_same_run_duplicates() {
    let temp = tempdir().unwrap();
    let input = write_trace(temp.path());
    let output = temp.path().join("recovered").join("checkins.csv");

    let summary = recover_file(&input, &output, &RecoveryConfig::default()).unwrap();

    assert_eq!(fs::read_to_string(&output).unwrap(), EXPECTED_ROWS);
    assert_eq!(summary.recovered, 3);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.seeded_keys, 0);
    assert_eq!(summary.correlation.opened, 5);
    assert_eq!(summary.correlation.completed, 4);
    assert_eq!(summary.correlation.expired, 1);
    assert_eq!(summary.correlation.unmatched_completions, 1);
    assert_eq!(summary.correlation.left_open, 0);
}

#[test]
fn single_slot_policy_loses_interleaved_start() {
    let temp = tempdir().unwrap();
    let input = write_trace(temp.path());
    let output = temp.path().join("checkins.csv");
    let config = RecoveryConfig::default().with_pending_policy(PendingPolicy::SingleSlot);

    let summary = recover_file(&input, &output, &config).unwrap();

    let contents = fs::read_to_string(&output).unwrap();
    assert!(!contents.contains("23456789"));
    assert!(contents.contains("45678923,2025-02-14 09:32:01,Staff,7"));
    assert_eq!(summary.recovered, 2);
    assert_eq!(summary.correlation.unmatched_completions, 2);
}

#[test]
fn rerun_without_seeding_duplicates_earlier_output() {
    let temp = tempdir().unwrap();
    let input = write_trace(temp.path());
    let output = temp.path().join("checkins.csv");
    let config = RecoveryConfig::default();

    recover_file(&input, &output, &config).unwrap();
    let second = recover_file(&input, &output, &config).unwrap();

    // Keys start empty on every run, so nothing stops the second pass.
    assert_eq!(second.recovered, 3);
    let contents = fs::read_to_string(&output).unwrap();
    assert_eq!(contents, format!("{EXPECTED_ROWS}{EXPECTED_ROWS}"));
}

#[test]
fn rerun_with_seeding_appends_nothing() {
    let temp = tempdir().unwrap();
    let input = write_trace(temp.path());
    let output = temp.path().join("checkins.csv");
    let config = RecoveryConfig::default().with_seed_keys_from_output(true);

    let first = recover_file(&input, &output, &config).unwrap();
    assert_eq!(first.seeded_keys, 0);
    let second = recover_file(&input, &output, &config).unwrap();

    assert_eq!(second.seeded_keys, 3);
    assert_eq!(second.recovered, 0);
    assert_eq!(second.duplicates, 4);
    assert_eq!(fs::read_to_string(&output).unwrap(), EXPECTED_ROWS);

    let log = CheckinLog::read(&output).unwrap();
    assert_eq!(log.rows().len(), 3);
    assert!(log.rows().iter().all(|row| row.visit_count.is_some()));
}

#[test]
fn missing_trace_is_reported_before_output_is_touched() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("nope.log");
    let output = temp.path().join("checkins.csv");

    match recover_file(&input, &output, &RecoveryConfig::default()) {
        Err(RecoveryError::InputMissing { path }) => assert_eq!(path, input),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn invalid_timeout_is_rejected() {
    let temp = tempdir().unwrap();
    let input = write_trace(temp.path());
    let output = temp.path().join("checkins.csv");
    let config = RecoveryConfig::default().with_timeout_secs(0);

    assert!(matches!(
        recover_file(&input, &output, &config),
        Err(RecoveryError::Configuration(_))
    ));
}
