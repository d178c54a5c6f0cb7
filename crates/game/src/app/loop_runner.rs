use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::ExitCode;

use manor_engine::{AppError, HeadlessLoop, PresentationLog, RunSummary};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_app(app) {
        Ok(summary) => {
            info!(
                lines = summary.lines_processed,
                ticks = summary.ticks_run,
                quit = summary.quit_requested,
                "run_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_app(app: AppWiring) -> Result<RunSummary, AppError> {
    let AppWiring {
        config,
        scene,
        presenter,
        script_path,
    } = app;
    let mut headless = HeadlessLoop::new(&config, scene, presenter);
    headless.load();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    flush_output(&mut headless, &mut out);

    let summary = match script_path {
        Some(path) => {
            let file = open_script(&path)?;
            drive(&mut headless, BufReader::new(file), &mut out)?
        }
        None => drive(&mut headless, io::stdin().lock(), &mut out)?,
    };
    headless.shutdown();
    flush_output(&mut headless, &mut out);
    Ok(summary)
}

fn open_script(path: &Path) -> Result<File, AppError> {
    info!(path = %path.display(), "command_script_opened");
    File::open(path).map_err(|source| AppError::OpenScript {
        path: path.to_path_buf(),
        source,
    })
}

/// One line at a time so console output interleaves with the input that produced it.
fn drive(
    headless: &mut HeadlessLoop<PresentationLog>,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<RunSummary, AppError> {
    let mut lines_processed = 0;
    for line in input.lines() {
        if headless.quit_requested() {
            break;
        }
        let line = line.map_err(AppError::ReadInput)?;
        headless.submit_line(&line);
        headless.pump();
        lines_processed += 1;
        flush_output(headless, out);
    }
    Ok(RunSummary {
        lines_processed,
        ticks_run: headless.ticks_run(),
        quit_requested: headless.quit_requested(),
    })
}

fn flush_output(headless: &mut HeadlessLoop<PresentationLog>, out: &mut impl Write) {
    for line in headless.drain_output_lines() {
        // A closed stdout only loses console echo.
        let _ = writeln!(out, "{line}");
    }
    for event in headless.presenter_mut().drain_events() {
        match serde_json::to_string(&event) {
            Ok(json) => {
                let _ = writeln!(out, "{json}");
            }
            Err(err) => error!(error = %err, "presentation_event_encode_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use manor_engine::builtin_mansion_blueprint;

    use super::*;
    use crate::app::bootstrap::wire;
    use crate::app::config::GameConfig;

    fn headless() -> HeadlessLoop<PresentationLog> {
        let blueprint = builtin_mansion_blueprint().expect("builtin");
        let config = GameConfig {
            echo_presentation: false,
            ..GameConfig::default()
        };
        let wiring = wire(&config, &blueprint).expect("wire");
        HeadlessLoop::new(&wiring.config, wiring.scene, wiring.presenter)
    }

    #[test]
    fn script_lines_drive_the_scene_until_quit() {
        let mut headless = headless();
        let script = "wait 1\nstatus\nquit\nwait 100\n";
        let mut out = Vec::new();
        let summary = drive(&mut headless, script.as_bytes(), &mut out).expect("drive");

        assert_eq!(summary.lines_processed, 3);
        assert!(summary.quit_requested);
        assert_eq!(summary.ticks_run, 60);
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("\"room_name\":\"Hallway\""), "{text}");
        assert!(text.contains("Hallway"));
    }

    #[test]
    fn missing_script_is_reported() {
        let error = open_script(Path::new("/definitely/not/a/script.txt")).expect_err("missing");
        assert!(matches!(error, AppError::OpenScript { .. }));
    }
}
