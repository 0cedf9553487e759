//! typestack binary entry point.

use std::process::ExitCode;

use typestack::cli;
use typestack::ui::output;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{err:#}"));
            if let Some(hint) = cli::hint_for(&err) {
                output::hint(hint);
            }
            ExitCode::FAILURE
        }
    }
}
