//! Binary entrypoint for the terminal PDF Q&A client.

use std::process::ExitCode;

use pdfqa_client::start_client;

/// Restore the session, then run the interactive command loop.
fn main() -> ExitCode {
    start_client::run()
}
