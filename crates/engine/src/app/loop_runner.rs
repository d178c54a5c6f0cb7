use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::{ContentCompileError, StartupError};

use super::input::ActionStates;
use super::tools::{ConsoleCommandProcessor, ConsoleState, DebugCommand, PressAction};
use super::{
    InputAction, InputSnapshot, Presenter, Scene, SceneCommand, SceneDebugCommand,
    SceneDebugCommandResult,
};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_ticks_per_advance: u32,
    pub start_pointer_locked: bool,
    pub echo_console_input: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks_per_advance: 60 * 60 * 10,
            start_pointer_locked: true,
            echo_console_input: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to compile room blueprints: {0}")]
    Content(#[from] ContentCompileError),
    #[error("failed to open command script {path}: {source}")]
    OpenScript {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read command input: {0}")]
    ReadInput(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_processed: usize,
    pub ticks_run: u64,
    pub quit_requested: bool,
}

/// Fixed-step driver without a window: console lines drive input and debug commands,
/// simulated time only advances when a command asks for it.
pub struct HeadlessLoop<P: Presenter> {
    scene: Box<dyn Scene>,
    presenter: P,
    console: ConsoleState,
    commands: ConsoleCommandProcessor,
    input: InputCollector,
    fixed_dt: Duration,
    fixed_dt_seconds: f32,
    max_ticks_per_advance: u32,
    accumulator: Duration,
    ticks_run: u64,
    quit_requested: bool,
    is_loaded: bool,
    last_title: Option<String>,
}

impl<P: Presenter> HeadlessLoop<P> {
    pub fn new(config: &LoopConfig, scene: Box<dyn Scene>, presenter: P) -> Self {
        let target_tps = config.target_tps.max(1);
        // Truncated so `target_tps` steps never exceed one second of accumulated time.
        let fixed_dt = Duration::from_nanos(1_000_000_000 / u64::from(target_tps));
        let max_ticks_per_advance = config.max_ticks_per_advance.max(1);
        info!(
            target_tps,
            max_ticks_per_advance,
            pointer_locked = config.start_pointer_locked,
            "loop_config"
        );
        Self {
            scene,
            presenter,
            console: ConsoleState::default().with_echo_input(config.echo_console_input),
            commands: ConsoleCommandProcessor::new(),
            input: InputCollector::new(config.start_pointer_locked),
            fixed_dt,
            fixed_dt_seconds: fixed_dt.as_secs_f32(),
            max_ticks_per_advance,
            accumulator: Duration::ZERO,
            ticks_run: 0,
            quit_requested: false,
            is_loaded: false,
            last_title: None,
        }
    }

    pub fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.presenter);
        self.is_loaded = true;
        self.refresh_title();
        info!("scene_loaded");
    }

    pub fn shutdown(&mut self) {
        if !self.is_loaded {
            return;
        }
        self.scene.unload(&mut self.presenter);
        self.is_loaded = false;
        info!(ticks_run = self.ticks_run, "shutdown");
    }

    pub fn submit_line(&mut self, line: &str) {
        self.console.submit_line(line);
    }

    /// Parses every submitted line and executes the resulting commands in order.
    pub fn pump(&mut self) {
        self.load();
        self.commands.process_pending_lines(&mut self.console);
        let mut queued = Vec::new();
        self.commands.drain_pending_debug_commands_into(&mut queued);
        for command in queued {
            if self.quit_requested {
                break;
            }
            self.execute(command);
        }
    }

    pub fn run_lines<I, S>(&mut self, lines: I) -> RunSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines_processed = 0;
        for line in lines {
            if self.quit_requested {
                break;
            }
            self.submit_line(line.as_ref());
            self.pump();
            lines_processed += 1;
        }
        RunSummary {
            lines_processed,
            ticks_run: self.ticks_run,
            quit_requested: self.quit_requested,
        }
    }

    pub fn run_ticks(&mut self, ticks: u32) {
        self.load();
        for _ in 0..ticks {
            if self.quit_requested {
                break;
            }
            let snapshot = self.input.snapshot_for_tick();
            let command = self
                .scene
                .update(self.fixed_dt_seconds, &snapshot, &mut self.presenter);
            self.ticks_run = self.ticks_run.saturating_add(1);
            if command == SceneCommand::Quit || snapshot.quit_requested() {
                info!(reason = "scene_command", "shutdown_requested");
                self.quit_requested = true;
            }
        }
        self.refresh_title();
    }

    pub fn advance_seconds(&mut self, seconds: f32) {
        // Values too large for a Duration saturate; the tick cap drops the excess.
        let added = Duration::try_from_secs_f32(seconds.max(0.0)).unwrap_or(Duration::MAX);
        self.accumulator = self.accumulator.saturating_add(added);
        let step_plan = plan_sim_steps(self.accumulator, self.fixed_dt, self.max_ticks_per_advance);
        self.accumulator = step_plan.remaining_accumulator;
        self.run_ticks(step_plan.ticks_to_run);
        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_advance = self.max_ticks_per_advance,
                "sim_clamp_triggered"
            );
        }
    }

    pub fn drain_output_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        self.console.drain_output_lines_into(&mut lines);
        lines
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn scene(&self) -> &dyn Scene {
        self.scene.as_ref()
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    fn execute(&mut self, command: DebugCommand) {
        match command {
            DebugCommand::Quit => {
                info!(reason = "console", "shutdown_requested");
                self.quit_requested = true;
            }
            DebugCommand::Tick { ticks } => self.run_ticks(ticks),
            DebugCommand::Wait { seconds } => self.advance_seconds(seconds),
            DebugCommand::Hold { action, is_down } => self.input.set_action(action, is_down),
            DebugCommand::PointerLock { locked } => {
                self.input.set_pointer_locked(locked);
                info!(pointer_locked = locked, "pointer_lock_changed");
            }
            DebugCommand::Press { action } => {
                self.input.press(action);
                self.run_ticks(1);
            }
            DebugCommand::Scene(scene_command) => self.execute_scene_command(scene_command),
        }
    }

    fn execute_scene_command(&mut self, command: SceneDebugCommand) {
        let label = format!("{command:?}");
        match self
            .scene
            .execute_debug_command(command, &mut self.presenter)
        {
            SceneDebugCommandResult::Success(message) => {
                if !message.is_empty() {
                    self.console.append_output_line(message);
                }
            }
            SceneDebugCommandResult::Error(message) => {
                self.console.append_output_line(format!("error: {message}"));
            }
            SceneDebugCommandResult::Unsupported => {
                warn!(command = %label, "scene_debug_command_unsupported");
                self.console
                    .append_output_line("error: command unsupported by active scene");
            }
        }
        self.refresh_title();
    }

    fn refresh_title(&mut self) {
        let next_title = self.scene.debug_title();
        if next_title != self.last_title {
            if let Some(title) = &next_title {
                info!(title = %title, "scene_title_changed");
            }
            self.last_title = next_title;
        }
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    interact_pressed_edge: bool,
    flashlight_pressed_edge: bool,
    pointer_locked: bool,
}

impl InputCollector {
    fn new(pointer_locked: bool) -> Self {
        Self {
            pointer_locked,
            ..Self::default()
        }
    }

    fn set_action(&mut self, action: InputAction, is_down: bool) {
        if action == InputAction::Quit {
            if is_down {
                self.quit_requested = true;
            }
            return;
        }
        // Movement is ignored entirely while the pointer is free.
        if is_down && !self.pointer_locked {
            return;
        }
        self.action_states.set(action, is_down);
    }

    fn set_pointer_locked(&mut self, locked: bool) {
        self.pointer_locked = locked;
        if !locked {
            self.action_states.clear_movement();
        }
    }

    fn press(&mut self, action: PressAction) {
        match action {
            PressAction::Interact => self.interact_pressed_edge = true,
            PressAction::Flashlight => self.flashlight_pressed_edge = true,
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.interact_pressed_edge,
            self.flashlight_pressed_edge,
            self.pointer_locked,
            0.0,
        );
        self.interact_pressed_edge = false;
        self.flashlight_pressed_edge = false;
        snapshot
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(mut accumulator: Duration, fixed_dt: Duration, max_ticks: u32) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::app::PresentationLog;

    #[derive(Debug, Default)]
    struct Recorded {
        loads: u32,
        unloads: u32,
        snapshots: Vec<InputSnapshot>,
        debug_commands: Vec<SceneDebugCommand>,
    }

    struct RecordingScene {
        recorded: Rc<RefCell<Recorded>>,
        quit_after_ticks: Option<usize>,
    }

    impl Scene for RecordingScene {
        fn load(&mut self, _presenter: &mut dyn Presenter) {
            self.recorded.borrow_mut().loads += 1;
        }

        fn update(
            &mut self,
            _fixed_dt_seconds: f32,
            input: &InputSnapshot,
            _presenter: &mut dyn Presenter,
        ) -> SceneCommand {
            let mut recorded = self.recorded.borrow_mut();
            recorded.snapshots.push(*input);
            match self.quit_after_ticks {
                Some(limit) if recorded.snapshots.len() >= limit => SceneCommand::Quit,
                _ => SceneCommand::None,
            }
        }

        fn unload(&mut self, _presenter: &mut dyn Presenter) {
            self.recorded.borrow_mut().unloads += 1;
        }

        fn execute_debug_command(
            &mut self,
            command: SceneDebugCommand,
            _presenter: &mut dyn Presenter,
        ) -> SceneDebugCommandResult {
            let result = match &command {
                SceneDebugCommand::DumpState => SceneDebugCommandResult::Success("ok".to_string()),
                SceneDebugCommand::GotoRoom { room_index } if *room_index > 3 => {
                    SceneDebugCommandResult::Error(format!("room {room_index} out of range"))
                }
                _ => SceneDebugCommandResult::Unsupported,
            };
            self.recorded.borrow_mut().debug_commands.push(command);
            result
        }
    }

    fn build_loop(quit_after_ticks: Option<usize>) -> (HeadlessLoop<PresentationLog>, Rc<RefCell<Recorded>>) {
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let scene = RecordingScene {
            recorded: Rc::clone(&recorded),
            quit_after_ticks,
        };
        let config = LoopConfig {
            echo_console_input: false,
            ..LoopConfig::default()
        };
        (
            HeadlessLoop::new(&config, Box::new(scene), PresentationLog::new()),
            recorded,
        )
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(10);
        let plan = plan_sim_steps(Duration::from_millis(35), fixed_dt, 10);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.remaining_accumulator, Duration::from_millis(5));
        assert_eq!(plan.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(10);
        let plan = plan_sim_steps(Duration::from_millis(100), fixed_dt, 3);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.remaining_accumulator, Duration::ZERO);
        assert_eq!(plan.dropped_backlog, Duration::from_millis(70));
    }

    #[test]
    fn first_pump_loads_scene_once() {
        let (mut runner, recorded) = build_loop(None);
        runner.run_lines(["tick", "tick 2"]);
        assert_eq!(recorded.borrow().loads, 1);
        assert_eq!(runner.ticks_run(), 3);

        runner.shutdown();
        runner.shutdown();
        assert_eq!(recorded.borrow().unloads, 1);
    }

    #[test]
    fn interact_press_is_edge_triggered_for_single_tick() {
        let (mut runner, recorded) = build_loop(None);
        runner.run_lines(["interact", "tick"]);

        let recorded = recorded.borrow();
        assert_eq!(recorded.snapshots.len(), 2);
        assert!(recorded.snapshots[0].interact_pressed());
        assert!(!recorded.snapshots[1].interact_pressed());
    }

    #[test]
    fn held_movement_persists_until_released_or_pointer_lost() {
        let (mut runner, recorded) = build_loop(None);
        runner.run_lines(["hold forward", "tick", "pointer off", "tick", "hold left", "tick"]);

        let recorded = recorded.borrow();
        assert!(recorded.snapshots[0].is_down(InputAction::MoveForward));
        assert!(!recorded.snapshots[1].is_down(InputAction::MoveForward));
        assert!(!recorded.snapshots[1].pointer_locked());
        assert!(!recorded.snapshots[2].is_down(InputAction::MoveLeft));
    }

    #[test]
    fn wait_converts_seconds_to_fixed_ticks() {
        let (mut runner, _) = build_loop(None);
        runner.run_lines(["wait 0.5"]);
        assert_eq!(runner.ticks_run(), 30);
    }

    #[test]
    fn whole_seconds_run_exactly_tps_ticks() {
        let (mut runner, _) = build_loop(None);
        runner.advance_seconds(1.0);
        assert_eq!(runner.ticks_run(), 60);
        runner.advance_seconds(2.0);
        assert_eq!(runner.ticks_run(), 180);
    }

    #[test]
    fn oversized_wait_is_capped_instead_of_panicking() {
        let (mut runner, recorded) = build_loop(None);
        runner.run_lines(["wait 1e30"]);
        let cap = u64::from(LoopConfig::default().max_ticks_per_advance);
        assert_eq!(runner.ticks_run(), cap);
        assert_eq!(recorded.borrow().snapshots.len() as u64, cap);

        runner.advance_seconds(f32::MAX);
        assert_eq!(runner.ticks_run(), cap * 2);
    }

    #[test]
    fn quit_stops_processing_remaining_lines() {
        let (mut runner, _) = build_loop(None);
        let summary = runner.run_lines(["tick", "quit", "tick 5"]);
        assert!(summary.quit_requested);
        assert_eq!(summary.lines_processed, 2);
        assert_eq!(summary.ticks_run, 1);
    }

    #[test]
    fn scene_quit_command_ends_run() {
        let (mut runner, _) = build_loop(Some(2));
        let summary = runner.run_lines(["tick 10"]);
        assert!(summary.quit_requested);
        assert_eq!(summary.ticks_run, 2);
    }

    #[test]
    fn scene_debug_results_are_written_to_console() {
        let (mut runner, recorded) = build_loop(None);
        runner.run_lines(["dump_state", "goto_room 9", "face 90", "goto_room x"]);

        assert_eq!(
            runner.drain_output_lines(),
            vec![
                "ok".to_string(),
                "error: room 9 out of range".to_string(),
                "error: command unsupported by active scene".to_string(),
                "error: invalid room index 'x' (expected usize). usage: goto_room <room>"
                    .to_string(),
            ]
        );
        assert_eq!(recorded.borrow().debug_commands.len(), 3);
    }
}
