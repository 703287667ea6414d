// src/main.rs

use std::process::ExitCode;

use jobsched::{cli, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("jobsched error: cannot set up logging: {err:#}");
        return ExitCode::FAILURE;
    }
    tracing::debug!(?args, "parsed command line");

    match jobsched::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("jobsched error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
