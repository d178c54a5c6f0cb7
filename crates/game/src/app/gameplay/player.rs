use manor_engine::{HorizontalBounds, InputAction, InputSnapshot, Vec3};
use serde::Serialize;

const MOVE_SPEED_UNITS_PER_SECOND: f32 = 3.25;

/// First-person controller. Reports a world position to the core and never reads game state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PlayerController {
    position: Vec3,
    yaw_radians: f32,
    flashlight_on: bool,
}

impl Default for PlayerController {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw_radians: 0.0,
            flashlight_on: false,
        }
    }
}

impl PlayerController {
    pub(crate) fn position(&self) -> Vec3 {
        self.position
    }

    pub(crate) fn yaw_radians(&self) -> f32 {
        self.yaw_radians
    }

    pub(crate) fn flashlight_on(&self) -> bool {
        self.flashlight_on
    }

    /// Yaw 0 looks down -z, toward the next room's door.
    pub(crate) fn forward(&self) -> Vec3 {
        Vec3::new(-self.yaw_radians.sin(), 0.0, -self.yaw_radians.cos())
    }

    pub(crate) fn right(&self) -> Vec3 {
        Vec3::new(self.yaw_radians.cos(), 0.0, -self.yaw_radians.sin())
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, bounds: &HorizontalBounds) {
        if !input.pointer_locked() {
            return;
        }
        self.yaw_radians += input.yaw_delta_radians();

        let axis = |positive: InputAction, negative: InputAction| -> f32 {
            f32::from(u8::from(input.is_down(positive))) - f32::from(u8::from(input.is_down(negative)))
        };
        let forward_axis = axis(InputAction::MoveForward, InputAction::MoveBackward);
        let right_axis = axis(InputAction::MoveRight, InputAction::MoveLeft);
        let direction = self.forward() * forward_axis + self.right() * right_axis;
        if direction.length_squared() <= f32::EPSILON {
            return;
        }
        let step = direction.normalize() * MOVE_SPEED_UNITS_PER_SECOND * fixed_dt_seconds;
        self.position = bounds.clamp(self.position + step);
    }

    pub(crate) fn teleport(&mut self, position: Vec3) {
        self.position = position;
    }

    pub(crate) fn face(&mut self, yaw_radians: f32) {
        self.yaw_radians = yaw_radians;
    }

    pub(crate) fn set_flashlight(&mut self, on: bool) {
        self.flashlight_on = on;
    }

    /// Returns the new flashlight state.
    pub(crate) fn toggle_flashlight(&mut self) -> bool {
        self.flashlight_on = !self.flashlight_on;
        self.flashlight_on
    }
}
