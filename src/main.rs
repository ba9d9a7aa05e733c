// Entrypoint for the CLI application.
// - Parses arguments, prints help or usage errors itself.
// - Reads credentials and gateway settings once and hands a session
//   constructor to the runner.
// - Maps every failure to exit code 1.

use std::io;
use std::process::ExitCode;

use webapi_cli::args::{parse_args, Parsed, HELP_TEXT};
use webapi_cli::config::{Credentials, GatewayConfig};
use webapi_cli::error::RunError;
use webapi_cli::gateway::GatewaySession;
use webapi_cli::logging;
use webapi_cli::runner::Runner;

fn main() -> ExitCode {
    logging::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let request = match parse_args(&argv) {
        Ok(Parsed::Help) => {
            println!("{}", HELP_TEXT);
            return ExitCode::SUCCESS;
        }
        Ok(Parsed::Run(request)) => request,
        Err(e) => return fail(RunError::from(e)),
    };

    let credentials = Credentials::from_env();
    let config = GatewayConfig::from_env();

    let stdout = io::stdout();
    let mut runner = Runner::new(stdout.lock());
    match runner.run(&request, || GatewaySession::new(config, credentials)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn fail(error: RunError) -> ExitCode {
    // The runner already reported the missing image and the response text.
    if !matches!(error, RunError::NoImages { .. }) {
        logging::report_error(error.prefix(), &error.to_string(), error.hint());
    }
    ExitCode::from(error.exit_code())
}
