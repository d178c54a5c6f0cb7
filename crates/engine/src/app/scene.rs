use super::input::{ActionStates, InputAction};
use super::math::Vec3;
use super::presentation::Presenter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneDebugCommand {
    /// Force-unlock every room before `room_index` and start there.
    SkipToRoom { room_index: usize },
    /// Plain room transition, no unlocking.
    GotoRoom { room_index: usize },
    Teleport { x: f32, y: f32, z: f32 },
    Face { yaw_degrees: f32 },
    Answer { text: String },
    ClosePopup,
    DumpState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneDebugCommandResult {
    Unsupported,
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    interact_pressed: bool,
    flashlight_toggle_pressed: bool,
    pointer_locked: bool,
    yaw_delta_radians: f32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        interact_pressed: bool,
        flashlight_toggle_pressed: bool,
        pointer_locked: bool,
        yaw_delta_radians: f32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            interact_pressed,
            flashlight_toggle_pressed,
            pointer_locked,
            yaw_delta_radians,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn flashlight_toggle_pressed(&self) -> bool {
        self.flashlight_toggle_pressed
    }

    pub fn pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    pub fn yaw_delta_radians(&self) -> f32 {
        self.yaw_delta_radians
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    pub fn with_flashlight_toggle_pressed(mut self, flashlight_toggle_pressed: bool) -> Self {
        self.flashlight_toggle_pressed = flashlight_toggle_pressed;
        self
    }

    pub fn with_pointer_locked(mut self, pointer_locked: bool) -> Self {
        self.pointer_locked = pointer_locked;
        if !pointer_locked {
            self.actions.clear_movement();
        }
        self
    }

    pub fn with_yaw_delta_radians(mut self, yaw_delta_radians: f32) -> Self {
        self.yaw_delta_radians = yaw_delta_radians;
        self
    }
}

pub trait Scene {
    fn load(&mut self, presenter: &mut dyn Presenter);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        presenter: &mut dyn Presenter,
    ) -> SceneCommand;
    fn unload(&mut self, presenter: &mut dyn Presenter);
    fn debug_title(&self) -> Option<String> {
        None
    }
    fn debug_player_position(&self) -> Option<Vec3> {
        None
    }
    fn execute_debug_command(
        &mut self,
        _command: SceneDebugCommand,
        _presenter: &mut dyn Presenter,
    ) -> SceneDebugCommandResult {
        SceneDebugCommandResult::Unsupported
    }
}
