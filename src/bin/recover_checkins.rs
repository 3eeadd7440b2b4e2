use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = std::io::stdout();
    let result = checkin_recovery::apps::run_recover_checkins(std::env::args().skip(1), &mut stdout);
    checkin_recovery::apps::exit_status(result)
}
