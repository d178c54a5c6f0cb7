use manor_engine::Vec3;
use tracing::info;

use super::super::hints::ShownHints;
use super::super::types::{ActionOutcome, PossessTarget};
use super::{
    advance_steps, GuardSpec, HeartSpawn, LetterSpawn, RoomAction, RoomEffect, RoomTarget,
    RoomTimer, RoomTransition,
};

const VALVE: RoomTarget = RoomTarget::Object("gas_valve");
const FAN: RoomTarget = RoomTarget::Object("exhaust_fan");
const POT: RoomTarget = RoomTarget::Object("cooking_pot");

const FAN_STEP_SECONDS: f32 = 0.1;
const FAN_STEPS: u32 = 30;
const VALVE_LOCAL: Vec3 = Vec3::new(2.5, 0.0, -4.5);
const FAN_LOCAL: Vec3 = Vec3::new(3.0, 0.0, -2.0);
const HISS_RADIUS: f32 = 3.0;
const HISS_COOLDOWN_SECONDS: f32 = 1.0;
const HEART_GUARD_MESSAGE: &str = "Read the letter before touching the heart fragment.";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum FanStage {
    #[default]
    Idle,
    Spinning {
        accumulator: f32,
        steps: u32,
    },
    Stopped,
}

/// Chairman's office: gas valve, exhaust fan, and the chef's cooking pot.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct OfficeState {
    gas_valve_open: bool,
    fan: FanStage,
    chef_distracted: bool,
    pot_opened: bool,
    letter_read: bool,
    heart_collected: bool,
    hiss_cooldown: f32,
}

pub(super) fn setup() -> Vec<RoomEffect> {
    vec![
        RoomEffect::SetPrompt(VALVE, "Press E to open gas valve"),
        RoomEffect::SetEnabled(FAN, false),
        RoomEffect::SetPrompt(FAN, "Open gas valve first"),
        RoomEffect::SetEnabled(POT, false),
        RoomEffect::SetPrompt(POT, "Chef is blocking the pot"),
    ]
}

impl OfficeState {
    pub(crate) fn gas_valve_open(&self) -> bool {
        self.gas_valve_open
    }

    pub(crate) fn chef_distracted(&self) -> bool {
        self.chef_distracted
    }

    pub(crate) fn pot_opened(&self) -> bool {
        self.pot_opened
    }

    pub(crate) fn stage(&self) -> String {
        if self.heart_collected {
            "key"
        } else if self.letter_read {
            "heart"
        } else if self.pot_opened {
            "letter"
        } else if self.chef_distracted {
            "pot"
        } else if matches!(self.fan, FanStage::Spinning { .. }) {
            "fan spinning"
        } else if self.gas_valve_open {
            "fan"
        } else {
            "valve"
        }
        .to_string()
    }

    pub(super) fn apply(&mut self, action: RoomAction<'_>) -> RoomTransition {
        match action {
            RoomAction::Possess(PossessTarget::GasValve) => self.open_valve(),
            RoomAction::Possess(PossessTarget::ExhaustFan) => self.spin_fan(),
            RoomAction::Possess(PossessTarget::CookingPot) => self.open_pot(),
            RoomAction::Tick {
                dt_seconds,
                seconds_in_room,
                player_local,
                shown,
            } => self.tick(dt_seconds, seconds_in_room, player_local, shown),
            RoomAction::Timer(RoomTimer::GasFlows) => {
                RoomTransition::effects(vec![RoomEffect::Hint {
                    text: "Gas flows freely now. Something else in this room might use it.",
                    seconds: 7.0,
                    key: None,
                }])
            }
            RoomAction::LetterRead if !self.letter_read => {
                self.letter_read = true;
                info!("office_letter_read");
                RoomTransition::effects(vec![
                    RoomEffect::Hint {
                        text: "The truth is in your hands. Claim the heart fragment, then the key.",
                        seconds: 9.0,
                        key: Some("letter_read"),
                    },
                    RoomEffect::SetPrompt(
                        RoomTarget::Heart,
                        "Press E to collect Heart Fragment #3",
                    ),
                    RoomEffect::ClearHeartGuard,
                ])
            }
            RoomAction::HeartCollected if !self.heart_collected => {
                self.heart_collected = true;
                RoomTransition::effects(vec![
                    RoomEffect::Hint {
                        text: "The fragment beats hot in your grasp. Take the chairman's key before he returns.",
                        seconds: 9.0,
                        key: Some("heart_collected"),
                    },
                    RoomEffect::ActivateKey,
                ])
            }
            _ => RoomTransition::unhandled(),
        }
    }

    fn open_valve(&mut self) -> RoomTransition {
        if self.gas_valve_open {
            return RoomTransition::blocked("The gas valve is already open.");
        }
        self.gas_valve_open = true;
        info!("office_gas_valve_opened");
        RoomTransition::outcome(
            ActionOutcome::new("Opening gas valve...", 3.0),
            vec![
                RoomEffect::SetPrompt(VALVE, "Gas valve opened"),
                RoomEffect::SetEnabled(FAN, true),
                RoomEffect::SetPrompt(FAN, "Press E to blow smoke"),
                RoomEffect::PlayCue("gas_valve"),
                RoomEffect::Schedule {
                    delay_seconds: 3.5,
                    timer: RoomTimer::GasFlows,
                },
            ],
        )
    }

    fn spin_fan(&mut self) -> RoomTransition {
        if !self.gas_valve_open {
            return RoomTransition::blocked("Open gas valve first");
        }
        if self.fan != FanStage::Idle {
            return RoomTransition::blocked("The fan is already turning.");
        }
        self.fan = FanStage::Spinning {
            accumulator: 0.0,
            steps: 0,
        };
        info!("office_fan_spinning");
        RoomTransition::outcome(
            ActionOutcome::new("Blowing smoke across room...", 5.0),
            vec![RoomEffect::PlayCue("fan_spin")],
        )
    }

    fn open_pot(&mut self) -> RoomTransition {
        if !self.chef_distracted {
            return RoomTransition::blocked("Chef is blocking the pot");
        }
        if self.pot_opened {
            return RoomTransition::blocked("The pot is already open.");
        }
        self.pot_opened = true;
        info!("office_pot_opened");
        RoomTransition::outcome(
            ActionOutcome::new("Opening cooking pot...", 4.0),
            vec![
                RoomEffect::PlayCue("pot_open"),
                RoomEffect::SetEnabled(POT, false),
                RoomEffect::SetEnabled(FAN, false),
                RoomEffect::SetEnabled(VALVE, false),
                RoomEffect::SpawnHeart(HeartSpawn {
                    prompt: Some(HEART_GUARD_MESSAGE.to_string()),
                    collect_message: Some("Heart Fragment #3 collected.".to_string()),
                    guard: Some(GuardSpec {
                        message: HEART_GUARD_MESSAGE,
                        duration_seconds: 7.0,
                        hint_key: Some("heart_guard"),
                    }),
                    silent: true,
                    letter: Some(LetterSpawn::with_prompts(
                        "Press E to read the chairman's confession",
                        "Press E to revisit the chairman's confession",
                    )),
                    ..HeartSpawn::default()
                }),
                RoomEffect::PlayCue("heart_spawn"),
                RoomEffect::Hint {
                    text: "Something hidden inside the pot stirs - the evidence, the heartbeat, everything they burned.",
                    seconds: 9.0,
                    key: Some("pot_opened"),
                },
                RoomEffect::CenterPrompt {
                    text: "Read the letter that survived the fire.",
                    seconds: 6.0,
                },
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

        if let FanStage::Spinning {
            mut accumulator,
            mut steps,
        } = self.fan
        {
            if advance_steps(
                &mut accumulator,
                &mut steps,
                dt_seconds,
                FAN_STEP_SECONDS,
                FAN_STEPS,
            ) {
                self.fan = FanStage::Stopped;
                self.chef_distracted = true;
                info!("office_chef_distracted");
                effects.extend([
                    RoomEffect::SetEnabled(POT, true),
                    RoomEffect::SetPrompt(POT, "Press E to open pot"),
                    RoomEffect::Hint {
                        text: "The chef stumbles away, coughing. His station is unguarded now.",
                        seconds: 7.0,
                        key: None,
                    },
                ]);
            } else {
                self.fan = FanStage::Spinning { accumulator, steps };
            }
        }

        self.hiss_cooldown = (self.hiss_cooldown - dt_seconds).max(0.0);
        if !self.gas_valve_open
            && planar_distance(player_local, VALVE_LOCAL) < HISS_RADIUS
            && self.hiss_cooldown <= 0.0
        {
            self.hiss_cooldown = HISS_COOLDOWN_SECONDS;
            effects.push(RoomEffect::PlayCue("gas_hiss"));
        }

        if !self.gas_valve_open {
            effects.extend(self.guidance(seconds_in_room, player_local, shown));
        }

        RoomTransition::effects(effects)
    }

    fn guidance(
        &self,
        seconds_in_room: f32,
        player_local: Vec3,
        shown: &ShownHints,
    ) -> Vec<RoomEffect> {
        let candidates: [(bool, &'static str, f32, &'static str); 6] = [
            (
                seconds_in_room > 2.0,
                "initial",
                8.0,
                "He guards that pot like it holds his sins. Search the room something will make him leave.",
            ),
            (
                seconds_in_room > 10.0,
                "idle",
                7.0,
                "There must be something here that creates a distraction. Look around.",
            ),
            (
                player_local.x < -1.0 && player_local.z < -2.0,
                "stove",
                6.0,
                "The air smells strange to the right. Follow it.",
            ),
            (
                seconds_in_room > 5.0 && planar_distance(player_local, FAN_LOCAL) < 4.0,
                "fan",
                6.0,
                "Stir the wind up there - it might help.",
            ),
            (
                player_local.x > 1.0,
                "rightwall",
                8.0,
                "A red wheel and a green grille - one opens, the other moves. Experiment.",
            ),
            (
                seconds_in_room > 30.0,
                "final",
                10.0,
                "Combine the objects on the right wall to create a distraction.",
            ),
        ];
        candidates
            .into_iter()
            .filter(|(ready, key, _, _)| *ready && !shown.contains(key))
            .map(|(_, key, seconds, text)| RoomEffect::Hint {
                text,
                seconds,
                key: Some(key),
            })
            .collect()
    }
}

fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}
