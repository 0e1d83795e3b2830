//! xlfmt - cosmetic reformatting of one .xlsx worksheet

mod cli;
mod session;

use std::process::ExitCode;

use clap::Parser;
use xlfmt_log::{LogContext, SpecLogConfig};

use crate::cli::Cli;
use crate::session::{N_EXIT_OK, derive_exit_code, report_error, run_session};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_ctx = LogContext::new(&SpecLogConfig::from_flags(cli.verbose, cli.quiet));

    log_ctx.scope(|| match run_session(&cli) {
        Ok(_) => ExitCode::from(N_EXIT_OK),
        Err(err) => {
            report_error(&err, cli.verbose);
            ExitCode::from(derive_exit_code(&err))
        }
    })
}
