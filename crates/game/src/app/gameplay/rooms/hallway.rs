use manor_engine::Vec3;
use tracing::info;

use super::super::hints::ShownHints;
use super::super::types::{ActionOutcome, PossessTarget};
use super::{
    advance_steps, HeartSpawn, LetterSpawn, RoomAction, RoomEffect, RoomTarget, RoomTimer,
    RoomTransition,
};

const PENDULUM_STEP_SECONDS: f32 = 0.1;
const PENDULUM_STEPS: u32 = 30;
const CANDLE_COUNT: usize = 3;
const CANDLE_PROMPT: &str = "Press E to light the candle";
const PENDULUM_PROMPT: &str = "Press E to possess the pendulum";
const BUTLER_IDLE_PROMPT: &str = "The butler stares through you";
const BUTLER_PROMPT: &str = "Press E to possess the butler";
const BUTLER_AGAIN_PROMPT: &str = "Press E to possess the butler again";

const CANDLE_BEATS: [(f32, &str, &str); 3] = [
    (3.5, "Something on the far wall has begun to glow.", "candle_beat_1"),
    (
        11.0,
        "Words surface in the wax light. A riddle waits to be read.",
        "candle_beat_2",
    ),
    (
        18.5,
        "Answer it, and the hall will remember how to move.",
        "candle_beat_3",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum PendulumStage {
    #[default]
    Still,
    Swinging {
        accumulator: f32,
        steps: u32,
    },
    Stopped,
}

/// Hallway chain: three candles, the riddle, the pendulum that knocks the key loose, and
/// the butler who picks it up and finally opens the door.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct HallwayState {
    candles_lit: [bool; CANDLE_COUNT],
    riddle_unlocked: bool,
    riddle_solved: bool,
    pendulum: PendulumStage,
    key_dropped: bool,
    butler_has_key: bool,
    door_opened: bool,
    heart_collected: bool,
    letter_read: bool,
}

pub(super) fn setup() -> Vec<RoomEffect> {
    let mut effects = vec![
        RoomEffect::SetVisible(RoomTarget::Key, false),
        RoomEffect::SetEnabled(RoomTarget::Riddle, false),
        RoomEffect::SetVisible(RoomTarget::Riddle, false),
        RoomEffect::SetEnabled(RoomTarget::Object("pendulum"), false),
        RoomEffect::SetPrompt(RoomTarget::Object("pendulum"), PENDULUM_PROMPT),
        RoomEffect::SetEnabled(RoomTarget::Object("butler"), false),
        RoomEffect::SetPrompt(RoomTarget::Object("butler"), BUTLER_IDLE_PROMPT),
    ];
    for candle in 1..=CANDLE_COUNT as u8 {
        effects.push(RoomEffect::SetPrompt(
            RoomTarget::Object(PossessTarget::Candle(candle).object_id()),
            CANDLE_PROMPT,
        ));
    }
    effects
}

impl HallwayState {
    pub(crate) fn candles_lit(&self) -> usize {
        self.candles_lit.iter().filter(|lit| **lit).count()
    }

    pub(crate) fn riddle_unlocked(&self) -> bool {
        self.riddle_unlocked
    }

    pub(crate) fn key_dropped(&self) -> bool {
        self.key_dropped
    }

    pub(crate) fn butler_has_key(&self) -> bool {
        self.butler_has_key
    }

    pub(crate) fn stage(&self) -> String {
        if self.door_opened {
            "door open".to_string()
        } else if self.key_dropped {
            "butler".to_string()
        } else if matches!(self.pendulum, PendulumStage::Swinging { .. }) {
            "pendulum swinging".to_string()
        } else if self.riddle_solved {
            "pendulum".to_string()
        } else if self.riddle_unlocked {
            "riddle".to_string()
        } else {
            format!("candles {}/{CANDLE_COUNT}", self.candles_lit())
        }
    }

    pub(super) fn apply(&mut self, action: RoomAction<'_>) -> RoomTransition {
        match action {
            RoomAction::Possess(PossessTarget::Candle(candle)) => self.light_candle(candle),
            RoomAction::Possess(PossessTarget::Pendulum) => self.swing_pendulum(),
            RoomAction::Possess(PossessTarget::Butler) => self.possess_butler(),
            RoomAction::RiddleSolved => self.solve_riddle(),
            RoomAction::Tick {
                dt_seconds,
                seconds_in_room,
                player_local,
                shown,
            } => self.tick(dt_seconds, seconds_in_room, player_local, shown),
            RoomAction::Timer(RoomTimer::CandleBeat(beat)) => candle_beat(beat),
            RoomAction::HeartCollected if !self.heart_collected => {
                self.heart_collected = true;
                RoomTransition::effects(vec![RoomEffect::Hint {
                    text: "The fragment pulses in your hand. The way onward stands open.",
                    seconds: 8.0,
                    key: Some("heart_collected"),
                }])
            }
            RoomAction::LetterRead if !self.letter_read => {
                self.letter_read = true;
                RoomTransition::effects(vec![RoomEffect::Hint {
                    text: "Ashes and a recorder. Someone came here looking for the truth.",
                    seconds: 8.0,
                    key: Some("letter_read"),
                }])
            }
            _ => RoomTransition::unhandled(),
        }
    }

    fn light_candle(&mut self, candle: u8) -> RoomTransition {
        let index = usize::from(candle.saturating_sub(1));
        if index >= CANDLE_COUNT {
            return RoomTransition::unhandled();
        }
        if self.candles_lit[index] {
            return RoomTransition::blocked("This candle already burns.");
        }
        self.candles_lit[index] = true;
        let lit = self.candles_lit();
        info!(candle, lit, "hallway_candle_lit");

        let candle_target = RoomTarget::Object(PossessTarget::Candle(candle).object_id());
        let mut effects = vec![
            RoomEffect::PlayCue("candle_light"),
            RoomEffect::SetEnabled(candle_target, false),
        ];
        match lit {
            1 => effects.push(RoomEffect::Hint {
                text: "One flame flickers to life. Two candles still sleep.",
                seconds: 6.0,
                key: Some("first_candle"),
            }),
            2 => effects.push(RoomEffect::Hint {
                text: "A second flame answers the first. One candle remains dark.",
                seconds: 6.0,
                key: Some("second_candle"),
            }),
            _ => {
                self.riddle_unlocked = true;
                info!("hallway_riddle_unlocked");
                effects.extend([
                    RoomEffect::MarkObjective("light-candles"),
                    RoomEffect::SetVisible(RoomTarget::Riddle, true),
                    RoomEffect::SetEnabled(RoomTarget::Riddle, true),
                    RoomEffect::Hint {
                        text: "All three candles burn. The hall holds its breath.",
                        seconds: 6.0,
                        key: Some("all_candles_lit"),
                    },
                ]);
                for (beat, (delay_seconds, _, _)) in CANDLE_BEATS.iter().enumerate() {
                    effects.push(RoomEffect::Schedule {
                        delay_seconds: *delay_seconds,
                        timer: RoomTimer::CandleBeat(beat as u8),
                    });
                }
            }
        }
        RoomTransition::outcome(ActionOutcome::new("Lighting the candle...", 2.0), effects)
    }

    fn solve_riddle(&mut self) -> RoomTransition {
        if self.riddle_solved {
            return RoomTransition::unhandled();
        }
        self.riddle_solved = true;
        RoomTransition::effects(vec![
            RoomEffect::SetEnabled(RoomTarget::Object("pendulum"), true),
            RoomEffect::Hint {
                text: "The answer echoes down the hall. The old clock shudders.",
                seconds: 7.0,
                key: Some("riddle_solved"),
            },
        ])
    }

    fn swing_pendulum(&mut self) -> RoomTransition {
        if !self.riddle_solved {
            return RoomTransition::blocked(
                "The pendulum will not move until the riddle is answered.",
            );
        }
        if self.pendulum != PendulumStage::Still {
            return RoomTransition::blocked("The pendulum has already swung.");
        }
        self.pendulum = PendulumStage::Swinging {
            accumulator: 0.0,
            steps: 0,
        };
        info!("hallway_pendulum_swinging");
        RoomTransition::outcome(
            ActionOutcome::new("Swinging the pendulum...", 3.0),
            vec![
                RoomEffect::PlayCue("pendulum_swing"),
                RoomEffect::SetEnabled(RoomTarget::Object("pendulum"), false),
            ],
        )
    }

    fn possess_butler(&mut self) -> RoomTransition {
        if !self.key_dropped {
            return RoomTransition::blocked("The butler has nothing to fetch yet.");
        }
        let butler = RoomTarget::Object("butler");
        if !self.butler_has_key {
            self.butler_has_key = true;
            info!("hallway_butler_took_key");
            return RoomTransition::outcome(
                ActionOutcome::new("Possessing the butler...", 3.0),
                vec![
                    RoomEffect::PocketKey,
                    RoomEffect::SetPrompt(butler, BUTLER_AGAIN_PROMPT),
                    RoomEffect::Hint {
                        text: "The butler stoops, takes the key, and turns toward the door.",
                        seconds: 7.0,
                        key: Some("butler_key"),
                    },
                ],
            );
        }
        if self.door_opened {
            return RoomTransition::blocked("The butler has done all he can.");
        }
        self.door_opened = true;
        info!("hallway_butler_opened_door");
        RoomTransition::outcome(
            ActionOutcome::new("The butler unlocks the door...", 3.0),
            vec![
                RoomEffect::SetEnabled(butler, false),
                RoomEffect::UnlockDoor,
                RoomEffect::SpawnHeart(HeartSpawn {
                    letter: Some(LetterSpawn::default()),
                    ..HeartSpawn::default()
                }),
            ],
        )
    }

    fn tick(
        &mut self,
        dt_seconds: f32,
        seconds_in_room: f32,
        player_local: Vec3,
        shown: &ShownHints,
    ) -> RoomTransition {
        let mut effects = Vec::new();

        if let PendulumStage::Swinging {
            mut accumulator,
            mut steps,
        } = self.pendulum
        {
            let finished = advance_steps(
                &mut accumulator,
                &mut steps,
                dt_seconds,
                PENDULUM_STEP_SECONDS,
                PENDULUM_STEPS,
            );
            if finished {
                self.pendulum = PendulumStage::Stopped;
                self.key_dropped = true;
                info!("hallway_key_dropped");
                effects.extend([
                    RoomEffect::PlayCue("key_drop"),
                    RoomEffect::ActivateKey,
                    RoomEffect::SetEnabled(RoomTarget::Object("butler"), true),
                    RoomEffect::SetPrompt(RoomTarget::Object("butler"), BUTLER_PROMPT),
                    RoomEffect::Hint {
                        text: "The pendulum strikes the cabinet. A key clatters to the floor.",
                        seconds: 7.0,
                        key: Some("key_dropped"),
                    },
                ]);
            } else {
                self.pendulum = PendulumStage::Swinging { accumulator, steps };
            }
        }

        if seconds_in_room > 2.0 && !shown.contains("intro") {
            effects.push(RoomEffect::Hint {
                text: "Three candles sleep in the dark. Wake them, one by one.",
                seconds: 7.0,
                key: Some("intro"),
            });
        }
        if seconds_in_room > 25.0 && !self.riddle_unlocked && !shown.contains("idle") {
            effects.push(RoomEffect::Hint {
                text: "The candles are waiting. Light all three and the house may answer.",
                seconds: 7.0,
                key: Some("idle"),
            });
        }
        if !self.riddle_unlocked
            && player_local.z > 2.5
            && player_local.x.abs() > 2.5
            && !shown.contains("candles_near")
        {
            effects.push(RoomEffect::Hint {
                text: "The wax is cold. Your touch could wake it.",
                seconds: 6.0,
                key: Some("candles_near"),
            });
        }
        if !self.key_dropped
            && player_local.x > 2.0
            && player_local.z < -2.0
            && !shown.contains("butler_near")
        {
            effects.push(RoomEffect::Hint {
                text: "The butler stands frozen by the wall, waiting for an order.",
                seconds: 6.0,
                key: Some("butler_near"),
            });
        }
        if !self.riddle_solved
            && player_local.x < -2.0
            && player_local.z < -2.0
            && !shown.contains("clock_near")
        {
            effects.push(RoomEffect::Hint {
                text: "The old clock has stopped. Its pendulum hangs still.",
                seconds: 6.0,
                key: Some("clock_near"),
            });
        }

        RoomTransition::effects(effects)
    }
}

fn candle_beat(beat: u8) -> RoomTransition {
    match CANDLE_BEATS.get(usize::from(beat)) {
        Some((_, text, key)) => RoomTransition::effects(vec![RoomEffect::Hint {
            text,
            seconds: 7.0,
            key: Some(key),
        }]),
        None => RoomTransition::unhandled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(state: &mut HallwayState, dt_seconds: f32, shown: &ShownHints) -> RoomTransition {
        state.apply(RoomAction::Tick {
            dt_seconds,
            seconds_in_room: 0.5,
            player_local: Vec3::ZERO,
            shown,
        })
    }

    fn has_hint(transition: &RoomTransition, wanted: &str) -> bool {
        transition.effects.iter().any(|effect| {
            matches!(effect, RoomEffect::Hint { key: Some(key), .. } if *key == wanted)
        })
    }

    #[test]
    fn candles_unlock_riddle_only_when_all_lit() {
        let mut state = HallwayState::default();
        let first = state.apply(RoomAction::Possess(PossessTarget::Candle(1)));
        assert!(has_hint(&first, "first_candle"));
        let second = state.apply(RoomAction::Possess(PossessTarget::Candle(2)));
        assert!(has_hint(&second, "second_candle"));
        assert!(!state.riddle_unlocked());

        let third = state.apply(RoomAction::Possess(PossessTarget::Candle(3)));
        assert!(state.riddle_unlocked());
        assert!(third
            .effects
            .contains(&RoomEffect::SetEnabled(RoomTarget::Riddle, true)));
        let scheduled = third
            .effects
            .iter()
            .filter(|effect| matches!(effect, RoomEffect::Schedule { .. }))
            .count();
        assert_eq!(scheduled, 3);
    }

    #[test]
    fn relighting_a_candle_is_blocked() {
        let mut state = HallwayState::default();
        state.apply(RoomAction::Possess(PossessTarget::Candle(2)));
        let again = state.apply(RoomAction::Possess(PossessTarget::Candle(2)));
        assert_eq!(
            again.outcome.map(|outcome| outcome.message),
            Some("This candle already burns.".to_string())
        );
        assert!(again.effects.is_empty());
        assert_eq!(state.candles_lit(), 1);
    }

    #[test]
    fn pendulum_requires_solved_riddle_and_drops_key_after_swing() {
        let mut state = HallwayState::default();
        let shown = ShownHints::default();
        let early = state.apply(RoomAction::Possess(PossessTarget::Pendulum));
        assert!(early.effects.is_empty());
        assert_eq!(state.pendulum, PendulumStage::Still);

        state.apply(RoomAction::RiddleSolved);
        state.apply(RoomAction::Possess(PossessTarget::Pendulum));
        let mut dropped = false;
        for _ in 0..29 {
            let transition = tick(&mut state, 0.1, &shown);
            dropped |= transition.effects.contains(&RoomEffect::ActivateKey);
        }
        assert!(!dropped);
        assert!(!state.key_dropped());

        let last = tick(&mut state, 0.1, &shown);
        assert!(last.effects.contains(&RoomEffect::ActivateKey));
        assert!(state.key_dropped());
        let after = tick(&mut state, 0.1, &shown);
        assert!(!after.effects.contains(&RoomEffect::ActivateKey));
    }

    #[test]
    fn butler_pockets_key_then_opens_door() {
        let mut state = HallwayState {
            riddle_solved: true,
            pendulum: PendulumStage::Stopped,
            key_dropped: true,
            ..HallwayState::default()
        };
        let first = state.apply(RoomAction::Possess(PossessTarget::Butler));
        assert!(first.effects.contains(&RoomEffect::PocketKey));
        assert!(!first.effects.contains(&RoomEffect::UnlockDoor));
        assert!(state.butler_has_key());

        let second = state.apply(RoomAction::Possess(PossessTarget::Butler));
        assert!(second.effects.contains(&RoomEffect::UnlockDoor));
        assert!(second
            .effects
            .iter()
            .any(|effect| matches!(effect, RoomEffect::SpawnHeart(_))));

        let third = state.apply(RoomAction::Possess(PossessTarget::Butler));
        assert!(!third.effects.contains(&RoomEffect::UnlockDoor));
    }

    #[test]
    fn butler_before_key_drop_is_blocked() {
        let mut state = HallwayState::default();
        let early = state.apply(RoomAction::Possess(PossessTarget::Butler));
        assert!(early.outcome.is_some());
        assert!(early.effects.is_empty());
        assert!(!state.butler_has_key());
    }

    #[test]
    fn intro_hint_waits_for_time_and_respects_shown_set() {
        let mut state = HallwayState::default();
        let mut shown = ShownHints::default();
        let at = |state: &mut HallwayState, seconds: f32, shown: &ShownHints| {
            state.apply(RoomAction::Tick {
                dt_seconds: 0.1,
                seconds_in_room: seconds,
                player_local: Vec3::ZERO,
                shown,
            })
        };
        assert!(!has_hint(&at(&mut state, 1.0, &shown), "intro"));
        assert!(has_hint(&at(&mut state, 2.5, &shown), "intro"));
        shown.admit(Some("intro"));
        assert!(!has_hint(&at(&mut state, 3.0, &shown), "intro"));
    }
}
