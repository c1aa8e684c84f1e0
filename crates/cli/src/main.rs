use std::process::ExitCode;

fn main() -> ExitCode {
    triad_cli::run()
}
