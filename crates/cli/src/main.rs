use std::process::ExitCode;

fn main() -> ExitCode {
    commissions_cli::run()
}
