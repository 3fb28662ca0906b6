use std::process::ExitCode;

fn main() -> ExitCode {
    hcplog_cli::run()
}
