#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    Quit,
}

const ACTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn clear_movement(&mut self) {
        for action in InputAction::MOVEMENT {
            self.set(action, false);
        }
    }
}

impl InputAction {
    pub const MOVEMENT: [InputAction; 4] = [
        InputAction::MoveForward,
        InputAction::MoveBackward,
        InputAction::MoveLeft,
        InputAction::MoveRight,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveForward => 0,
            InputAction::MoveBackward => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Quit => 4,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "forward" | "w" => Some(InputAction::MoveForward),
            "backward" | "back" | "s" => Some(InputAction::MoveBackward),
            "left" | "a" => Some(InputAction::MoveLeft),
            "right" | "d" => Some(InputAction::MoveRight),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_movement_keeps_quit() {
        let mut states = ActionStates::default();
        states.set(InputAction::MoveForward, true);
        states.set(InputAction::MoveLeft, true);
        states.set(InputAction::Quit, true);

        states.clear_movement();

        assert!(!states.is_down(InputAction::MoveForward));
        assert!(!states.is_down(InputAction::MoveLeft));
        assert!(states.is_down(InputAction::Quit));
    }

    #[test]
    fn movement_tokens_map_to_actions() {
        assert_eq!(InputAction::from_token("W"), Some(InputAction::MoveForward));
        assert_eq!(InputAction::from_token("back"), Some(InputAction::MoveBackward));
        assert_eq!(InputAction::from_token("quit"), None);
    }
}
