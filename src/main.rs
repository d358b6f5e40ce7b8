use std::process::ExitCode;

use clap::Parser;
use coffer::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    cli::init_tracing(args.verbose);

    let transfer = args.command.is_transfer();
    match args.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            cli::report_error(&err);
            ExitCode::from(cli::exit_code(&err, transfer))
        }
    }
}
