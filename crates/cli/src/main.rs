use std::process::ExitCode;

fn main() -> ExitCode {
    letterflow_cli::run()
}
