use tracing::info;

use super::super::types::{ActionOutcome, PropKind};
use super::{HeartSpawn, LetterSpawn, RoomAction, RoomEffect, RoomTarget, RoomTimer, RoomTransition};

const RELIC: RoomTarget = RoomTarget::Object("heart_relic");
const FINAL_KEY: RoomTarget = RoomTarget::Object("final_key");
const FINAL_LETTER: RoomTarget = RoomTarget::Object("final_letter");
const CHEST: RoomTarget = RoomTarget::Object("ornate_chest");
const MIRROR: RoomTarget = RoomTarget::Object("cracked_mirror");

const CHEST_LOCKED_PROMPT: &str = "Locked. Find the final key.";

pub(crate) const FINAL_LETTER_TITLE: &str = "Final Letter";
pub(crate) const FINAL_LETTER_BODY: &str = "My Dearest -\n\nYou should not have returned here. I wrote your name out of the will because you were already gone. The poison was mine, but the guilt was yours. We built this mansion from secrets - each room another lie we told ourselves.\n\nAnd now, you stand where your heart last beat.\n\nForgive me... or finish what we began.";

const NARRATION: [(f32, &str); 2] = [
    (3.5, "The chamber awaits the truth you buried."),
    (12.0, "Find the heart. Reclaim the name."),
];

/// Private chamber: the relic, the final key and letter, the chest, and the mirror.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct ChamberState {
    heart_merged: bool,
    key_revealed: bool,
    letter_revealed: bool,
    key_taken: bool,
    chest_opened: bool,
    letter_read: bool,
    mirror_awake: bool,
    mirror_faced: bool,
}

pub(super) fn setup() -> Vec<RoomEffect> {
    vec![
        RoomEffect::SetPrompt(RELIC, "Press E to merge heart fragment"),
        RoomEffect::SetVisible(FINAL_KEY, false),
        RoomEffect::SetPrompt(FINAL_KEY, "Press E to take the final key"),
        RoomEffect::SetVisible(FINAL_LETTER, false),
        RoomEffect::SetPrompt(FINAL_LETTER, "Press E to read the final letter"),
        RoomEffect::SetPrompt(CHEST, CHEST_LOCKED_PROMPT),
        RoomEffect::SetEnabled(MIRROR, false),
        RoomEffect::SetPrompt(MIRROR, "The mirror awaits..."),
    ]
}

impl ChamberState {
    pub(crate) fn heart_merged(&self) -> bool {
        self.heart_merged
    }

    pub(crate) fn key_revealed(&self) -> bool {
        self.key_revealed
    }

    pub(crate) fn chest_opened(&self) -> bool {
        self.chest_opened
    }

    pub(crate) fn stage(&self) -> String {
        if self.mirror_faced {
            "mirror faced"
        } else if self.mirror_awake {
            "mirror"
        } else if self.chest_opened {
            "chest open"
        } else if self.key_taken {
            "chest"
        } else if self.heart_merged {
            "final key"
        } else {
            "relic"
        }
        .to_string()
    }

    pub(super) fn apply(&mut self, action: RoomAction<'_>) -> RoomTransition {
        match action {
            RoomAction::Entered { .. } => self.enter(),
            RoomAction::Interact(PropKind::HeartRelic) => self.merge_heart(),
            RoomAction::Interact(PropKind::FinalKey) => self.take_final_key(),
            RoomAction::Interact(PropKind::FinalLetter) => self.read_final_letter(),
            RoomAction::Interact(PropKind::OrnateChest) => self.open_chest(),
            RoomAction::Interact(PropKind::CrackedMirror) => self.face_mirror(),
            RoomAction::PopupClosed(PropKind::FinalLetter) if !self.mirror_awake => {
                self.mirror_awake = true;
                RoomTransition::effects(vec![
                    RoomEffect::SetEnabled(MIRROR, true),
                    RoomEffect::SetPrompt(MIRROR, "Press E to face the truth"),
                    RoomEffect::Narrate {
                        text: "The mirror calls to you.",
                        seconds: 8.0,
                    },
                ])
            }
            RoomAction::Timer(timer) => self.on_timer(timer),
            _ => RoomTransition::unhandled(),
        }
    }

    /// Narration re-arms on every entry; reveals interrupted by leaving are re-armed too.
    fn enter(&mut self) -> RoomTransition {
        let mut effects: Vec<RoomEffect> = NARRATION
            .iter()
            .enumerate()
            .map(|(index, (delay_seconds, _))| RoomEffect::Schedule {
                delay_seconds: *delay_seconds,
                timer: RoomTimer::ChamberNarration(index as u8),
            })
            .collect();
        if self.heart_merged && !self.key_revealed {
            effects.push(RoomEffect::Schedule {
                delay_seconds: 3.0,
                timer: RoomTimer::FinalKeyReveal,
            });
        }
        if self.heart_merged && !self.letter_revealed {
            effects.push(RoomEffect::Schedule {
                delay_seconds: 5.0,
                timer: RoomTimer::FinalLetterReveal,
            });
        }
        RoomTransition::effects(effects)
    }

    fn on_timer(&mut self, timer: RoomTimer) -> RoomTransition {
        let effects = match timer {
            RoomTimer::ChamberNarration(index) => match NARRATION.get(usize::from(index)) {
                Some((_, text)) => vec![RoomEffect::Narrate { text, seconds: 8.0 }],
                None => return RoomTransition::unhandled(),
            },
            RoomTimer::FinalKeyReveal if !self.key_revealed => {
                self.key_revealed = true;
                info!("chamber_final_key_revealed");
                vec![
                    RoomEffect::SetVisible(FINAL_KEY, true),
                    RoomEffect::Narrate {
                        text: "The lock that killed you now seeks to open itself.",
                        seconds: 8.0,
                    },
                ]
            }
            RoomTimer::FinalLetterReveal if !self.letter_revealed => {
                self.letter_revealed = true;
                vec![RoomEffect::SetVisible(FINAL_LETTER, true)]
            }
            RoomTimer::TruthFound => vec![RoomEffect::Narrate {
                text: "You have found the truth.",
                seconds: 5.0,
            }],
            RoomTimer::MirrorChoice => vec![RoomEffect::Narrate {
                text: "Approach the heart to forgive. Approach the mirror to possess.",
                seconds: 10.0,
            }],
            _ => return RoomTransition::unhandled(),
        };
        RoomTransition::effects(effects)
    }

    fn merge_heart(&mut self) -> RoomTransition {
        if self.heart_merged {
            return RoomTransition::blocked("The heart already beats.");
        }
        self.heart_merged = true;
        info!("chamber_heart_merged");
        RoomTransition::outcome(
            ActionOutcome::new("Merging heart fragment...", 3.0),
            vec![
                RoomEffect::SetEnabled(RELIC, false),
                RoomEffect::Narrate {
                    text: "The heart beats again. You remember your name.",
                    seconds: 8.0,
                },
                RoomEffect::Schedule {
                    delay_seconds: 3.0,
                    timer: RoomTimer::FinalKeyReveal,
                },
                RoomEffect::Schedule {
                    delay_seconds: 5.0,
                    timer: RoomTimer::FinalLetterReveal,
                },
            ],
        )
    }

    fn take_final_key(&mut self) -> RoomTransition {
        if !self.key_revealed || self.key_taken {
            return RoomTransition::blocked("There is no key here.");
        }
        self.key_taken = true;
        info!("chamber_final_key_taken");
        RoomTransition::outcome(
            ActionOutcome::new("Taking the final key...", 2.0),
            vec![
                RoomEffect::SetVisible(FINAL_KEY, false),
                RoomEffect::SetPrompt(CHEST, "Press E to open the chest"),
                RoomEffect::Narrate {
                    text: "The final key is yours.",
                    seconds: 5.0,
                },
            ],
        )
    }

    fn read_final_letter(&mut self) -> RoomTransition {
        if !self.heart_merged {
            return RoomTransition::blocked("The letter stays sealed while the heart is silent.");
        }
        if !self.letter_read {
            self.letter_read = true;
            info!("chamber_final_letter_read");
        }
        RoomTransition::outcome(
            ActionOutcome::silent(),
            vec![
                RoomEffect::Speak(FINAL_LETTER_BODY),
                RoomEffect::ShowPopup {
                    prop: PropKind::FinalLetter,
                    title: FINAL_LETTER_TITLE,
                    body: FINAL_LETTER_BODY,
                },
            ],
        )
    }

    fn open_chest(&mut self) -> RoomTransition {
        if !self.key_taken {
            return RoomTransition::blocked(CHEST_LOCKED_PROMPT);
        }
        if self.chest_opened {
            return RoomTransition::blocked("The chest lies open.");
        }
        self.chest_opened = true;
        info!("chamber_chest_opened");
        RoomTransition::outcome(
            ActionOutcome::new("Opening the chest...", 3.0),
            vec![
                RoomEffect::SetEnabled(CHEST, false),
                RoomEffect::PlayCue("chest_open"),
                RoomEffect::Narrate {
                    text: "The chest opens. Your journey ends here.",
                    seconds: 8.0,
                },
                RoomEffect::Schedule {
                    delay_seconds: 3.0,
                    timer: RoomTimer::TruthFound,
                },
                RoomEffect::ActivateKey,
            ],
        )
    }

    fn face_mirror(&mut self) -> RoomTransition {
        if !self.letter_read {
            return RoomTransition::blocked("The mirror awaits...");
        }
        if self.mirror_faced {
            return RoomTransition::blocked("The mirror has shown you everything.");
        }
        self.mirror_faced = true;
        info!("chamber_mirror_faced");
        RoomTransition::outcome(
            ActionOutcome::new("The mirror reveals the truth...", 5.0),
            vec![
                RoomEffect::Narrate {
                    text: "She poured the poison. But you raised the glass. You both wanted the silence.",
                    seconds: 12.0,
                },
                RoomEffect::Schedule {
                    delay_seconds: 12.0,
                    timer: RoomTimer::MirrorChoice,
                },
                RoomEffect::SpawnHeart(HeartSpawn {
                    silent: true,
                    letter: Some(LetterSpawn::default()),
                    ..HeartSpawn::default()
                }),
            ],
        )
    }
}
