use tracing::info;

use super::{HeartSpawn, LetterSpawn, RoomAction, RoomEffect, RoomTransition};

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct LabsState {
    riddle_solved: bool,
    heart_collected: bool,
    letter_read: bool,
}

impl LabsState {
    pub(crate) fn stage(&self) -> String {
        match (self.riddle_solved, self.heart_collected) {
            (false, _) => "riddle",
            (true, false) => "heart",
            (true, true) => "key",
        }
        .to_string()
    }

    pub(super) fn apply(&mut self, action: RoomAction<'_>) -> RoomTransition {
        match action {
            RoomAction::Tick {
                seconds_in_room,
                shown,
                ..
            } => {
                let mut effects = Vec::new();
                if seconds_in_room > 2.0 && !shown.contains("intro") {
                    effects.push(RoomEffect::Hint {
                        text: "Whispers crowd the shelves. One relic asks a question.",
                        seconds: 7.0,
                        key: Some("intro"),
                    });
                }
                if seconds_in_room > 40.0 && !self.riddle_solved && !shown.contains("idle") {
                    effects.push(RoomEffect::Hint {
                        text: "Read the relic's question again. Count its glass eyes.",
                        seconds: 7.0,
                        key: Some("idle"),
                    });
                }
                RoomTransition::effects(effects)
            }
            RoomAction::RiddleSolved if !self.riddle_solved => {
                self.riddle_solved = true;
                info!("labs_riddle_solved");
                RoomTransition::effects(vec![
                    RoomEffect::SpawnHeart(HeartSpawn {
                        letter: Some(LetterSpawn::default()),
                        ..HeartSpawn::default()
                    }),
                    RoomEffect::Hint {
                        text: "The shelves exhale. Something red glimmers where the glass stood.",
                        seconds: 7.0,
                        key: Some("riddle_solved"),
                    },
                ])
            }
            RoomAction::HeartCollected if !self.heart_collected => {
                self.heart_collected = true;
                RoomTransition::effects(vec![RoomEffect::Hint {
                    text: "A second beat joins the first. The key waits in the open box.",
                    seconds: 8.0,
                    key: Some("heart_collected"),
                }])
            }
            RoomAction::LetterRead if !self.letter_read => {
                self.letter_read = true;
                RoomTransition::effects(vec![RoomEffect::Hint {
                    text: "The ink is older than the house. Someone wanted this found.",
                    seconds: 8.0,
                    key: Some("letter_read"),
                }])
            }
            _ => RoomTransition::unhandled(),
        }
    }
}
