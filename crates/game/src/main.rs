use std::process::ExitCode;

use tracing::error;

mod app {
    pub(crate) mod bootstrap;
    pub(crate) mod config;
    pub(crate) mod gameplay;
    pub(crate) mod loop_runner;
}

fn main() -> ExitCode {
    match app::bootstrap::build_app() {
        Ok(wiring) => app::loop_runner::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
