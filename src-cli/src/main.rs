use std::process::ExitCode;

use clap::Parser;
use ragchain_lib::{init_tracing, report_error, run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose());
    let json = cli.json();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, json);
            ExitCode::FAILURE
        }
    }
}
