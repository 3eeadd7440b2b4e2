use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono_tz::Tz;
use clap::{Parser, error::ErrorKind};

use crate::audit::{ExportDirectory, audit_store};
use crate::config::{PendingPolicy, RecoveryConfig, ReportConfig};
use crate::constants::report::{DEFAULT_CHECKIN_LOG, DEFAULT_DEBUG_LOG};
use crate::constants::timestamp::DEFAULT_TIME_ZONE;
use crate::recovery::recover_file;
use crate::report::build_report;
use crate::store::CheckinLog;

#[derive(Debug, Parser)]
#[command(
    name = "recover_checkins",
    disable_help_subcommand = true,
    about = "Recover check-ins from a debug trace",
    long_about = "Correlate start, response, update, and completion lines in a debug trace and append every recovered check-in to a CSV file.",
    after_help = "The output file is opened in append mode and is never truncated. Without --seed-from-output, re-running over the same trace appends the same records again."
)]
struct RecoverCheckinsCli {
    #[arg(value_name = "DEBUG_LOG_PATH", help = "Debug trace to read")]
    debug_log_path: PathBuf,
    #[arg(value_name = "OUTPUT_CSV_PATH", help = "CSV file to append recovered rows to")]
    output_path: PathBuf,
    #[arg(
        long = "timeout-secs",
        default_value_t = crate::constants::correlate::DEFAULT_TIMEOUT_SECS,
        value_parser = parse_positive_secs,
        help = "Seconds allowed between a transaction start and its completion"
    )]
    timeout_secs: i64,
    #[arg(
        long = "time-zone",
        value_name = "IANA_ZONE",
        default_value = DEFAULT_TIME_ZONE,
        value_parser = parse_time_zone,
        help = "Civil time zone the trace timestamps are written in"
    )]
    time_zone: Tz,
    #[arg(
        long = "single-slot",
        help = "Abandon other accounts' pending transactions whenever a new one starts"
    )]
    single_slot: bool,
    #[arg(
        long = "seed-from-output",
        help = "Skip records whose account and start second already appear in the output file"
    )]
    seed_from_output: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "compare_logs",
    disable_help_subcommand = true,
    about = "Report accounts missing from the check-in log",
    long_about = "List every account identifier mentioned in the debug trace that never appears in the canonical check-in log."
)]
struct CompareLogsCli {
    #[arg(
        long = "debug-log",
        value_name = "PATH",
        default_value = DEFAULT_DEBUG_LOG,
        help = "Debug trace to scan"
    )]
    debug_log: PathBuf,
    #[arg(
        long = "checkin-log",
        value_name = "PATH",
        default_value = DEFAULT_CHECKIN_LOG,
        help = "Canonical check-in log to compare against"
    )]
    checkin_log: PathBuf,
    #[arg(long, help = "Emit the report as JSON")]
    json: bool,
}

#[derive(Debug, Parser)]
#[command(
    name = "audit_notes",
    disable_help_subcommand = true,
    about = "Audit agreement notes for every account in the check-in log",
    long_about = "Check each real account in the canonical check-in log for the user agreement note and report whether it sits in the expected segment. Records are read from a directory of exported <account>.xml files; nothing is modified."
)]
struct AuditNotesCli {
    #[arg(
        long = "records-dir",
        value_name = "DIR",
        help = "Directory holding one exported <account>.xml record per account"
    )]
    records_dir: PathBuf,
    #[arg(
        long = "checkin-log",
        value_name = "PATH",
        default_value = DEFAULT_CHECKIN_LOG,
        help = "Canonical check-in log listing the accounts to audit"
    )]
    checkin_log: PathBuf,
    #[arg(long, help = "Emit the summary as JSON")]
    json: bool,
}

/// Run the trace recovery CLI, writing the run summary to `out`.
pub fn run_recover_checkins<I>(
    args_iter: I,
    out: &mut dyn Write,
) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) = parse_cli::<RecoverCheckinsCli, _>(
        std::iter::once("recover_checkins".to_string()).chain(args_iter),
        out,
    )?
    else {
        return Ok(());
    };

    let pending_policy = if cli.single_slot {
        PendingPolicy::SingleSlot
    } else {
        PendingPolicy::Keyed
    };
    let config = RecoveryConfig::default()
        .with_timeout_secs(cli.timeout_secs)
        .with_time_zone(cli.time_zone)
        .with_pending_policy(pending_policy)
        .with_seed_keys_from_output(cli.seed_from_output);

    let summary = recover_file(&cli.debug_log_path, &cli.output_path, &config)?;
    writeln!(out, "Processing complete. Found {} entries.", summary.recovered)?;
    writeln!(out, "Results written to {}", cli.output_path.display())?;
    summary.write_text(out)?;
    Ok(())
}

/// Run the discrepancy report CLI, writing the report to `out`.
pub fn run_compare_logs<I>(
    args_iter: I,
    out: &mut dyn Write,
) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) = parse_cli::<CompareLogsCli, _>(
        std::iter::once("compare_logs".to_string()).chain(args_iter),
        out,
    )?
    else {
        return Ok(());
    };

    let config = ReportConfig {
        debug_log: cli.debug_log,
        checkin_log: cli.checkin_log,
    };
    let report = build_report(&config)?;
    if cli.json {
        report.write_json(out)?;
    } else {
        report.write_text(&config, out)?;
    }
    Ok(())
}

/// Run the agreement-note audit CLI, writing the summary to `out`.
pub fn run_audit_notes<I>(args_iter: I, out: &mut dyn Write) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    init_tracing();

    let Some(cli) = parse_cli::<AuditNotesCli, _>(
        std::iter::once("audit_notes".to_string()).chain(args_iter),
        out,
    )?
    else {
        return Ok(());
    };

    let log = CheckinLog::read(&cli.checkin_log)?;
    let directory = ExportDirectory::open(cli.records_dir)?;
    let summary = audit_store(&directory, &log);
    if cli.json {
        serde_json::to_writer_pretty(&mut *out, &summary)?;
        writeln!(out)?;
    } else {
        summary.write_text(out)?;
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_positive_secs(raw: &str) -> Result<i64, String> {
    let parsed = raw.parse::<i64>().map_err(|_| {
        format!(
            "Could not parse --timeout-secs value '{}' as a positive integer",
            raw
        )
    })?;
    if parsed <= 0 {
        return Err("--timeout-secs must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_time_zone(raw: &str) -> Result<Tz, String> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|err| format!("Unknown --time-zone '{}': {}", raw, err))
}

/// Map a runner result to the process exit status.
///
/// Argument errors print clap's rendered message (with usage) and exit with
/// clap's status; any other error prints its message to stderr.
pub fn exit_status(result: Result<(), Box<dyn Error>>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(usage) = err.downcast_ref::<clap::Error>() {
                usage.exit();
            }
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_cli<T, I>(args: I, out: &mut dyn Write) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                write!(out, "{}", err.render())?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
