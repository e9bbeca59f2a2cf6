use std::process::ExitCode;

use clap::Parser;
use mail_fetch::cli::CliArgs;
use mail_fetch::config::RunConfig;
use mail_fetch::error::{EXIT_RUNTIME, EXIT_USAGE};
use mail_fetch::{logging, run};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match RunConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {e}", e.kind());
            eprintln!("\nFor help, run: mail-fetch --help");
            return ExitCode::from(e.exit_code());
        }
    };

    let _guard = match logging::init(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}: {e}", e.kind());
            return ExitCode::from(EXIT_RUNTIME);
        }
    };

    info!(
        user = %config.username,
        output = %config.output_dir.display(),
        attachments = config.include_attachments,
        all_results = config.fetch_all_pages,
        "mail-fetch starting"
    );

    match run(&config).await {
        Ok(summary) => {
            info!(
                messages = summary.messages,
                attachments = summary.attachments,
                results = %summary.results_path.display(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e.exit_code();
            error!(kind = e.kind(), "{e}");
            let kind = e.kind();
            error!(target: logging::FATAL_TARGET, kind = kind, "{:?}", anyhow::Error::new(e));
            ExitCode::from(code)
        }
    }
}
