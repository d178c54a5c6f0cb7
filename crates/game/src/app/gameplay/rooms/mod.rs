//! Per-room narrative state machines.
//!
//! Each room is a typed state value plus a transition function. A transition never
//! touches the world directly; it returns the effects the scene applies afterwards, so the
//! staged chains can be exercised without a live scene.

mod chamber;
mod hallway;
mod labs;
mod office;

use manor_engine::{AnchorOverride, Vec3};

use super::hints::ShownHints;
use super::types::{ActionOutcome, PossessTarget, PropKind};

pub(crate) use chamber::ChamberState;
pub(crate) use hallway::HallwayState;
pub(crate) use labs::LabsState;
pub(crate) use office::OfficeState;

/// Input to a room state machine.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RoomAction<'a> {
    Entered { first_visit: bool },
    Exited,
    Possess(PossessTarget),
    Interact(PropKind),
    RiddleSolved,
    HeartCollected,
    /// First close of the room's reward letter.
    LetterRead,
    PopupClosed(PropKind),
    Tick {
        dt_seconds: f32,
        seconds_in_room: f32,
        /// Player position relative to the room's floor center.
        player_local: Vec3,
        /// Keyed hints this room has already shown.
        shown: &'a ShownHints,
    },
    Timer(RoomTimer),
}

/// Delayed beats a room schedules for itself. Scoped to the room, dropped on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoomTimer {
    CandleBeat(u8),
    GasFlows,
    ChamberNarration(u8),
    FinalKeyReveal,
    FinalLetterReveal,
    MirrorChoice,
    TruthFound,
}

/// Which interactable of the room an effect addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoomTarget {
    Object(&'static str),
    Key,
    Riddle,
    Heart,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct LetterSpawn {
    /// Caller overrides, merged over the room's letter anchor.
    pub(crate) anchor: AnchorOverride,
    pub(crate) prompt: Option<String>,
    pub(crate) revisit_prompt: Option<String>,
}

impl LetterSpawn {
    pub(crate) fn with_prompts(prompt: &str, revisit_prompt: &str) -> Self {
        Self {
            prompt: Some(prompt.to_string()),
            revisit_prompt: Some(revisit_prompt.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct HeartSpawn {
    pub(crate) anchor: AnchorOverride,
    pub(crate) prompt: Option<String>,
    pub(crate) collect_message: Option<String>,
    pub(crate) guard: Option<GuardSpec>,
    /// Skip the "A Heart Fragment appears!" announcement.
    pub(crate) silent: bool,
    pub(crate) letter: Option<LetterSpawn>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GuardSpec {
    pub(crate) message: &'static str,
    pub(crate) duration_seconds: f32,
    pub(crate) hint_key: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RoomEffect {
    SetEnabled(RoomTarget, bool),
    SetVisible(RoomTarget, bool),
    SetPrompt(RoomTarget, &'static str),
    /// Keyed hints are shown at most once per room session.
    Hint {
        text: &'static str,
        seconds: f32,
        key: Option<&'static str>,
    },
    /// Center prompt that is also spoken aloud, without deduplication.
    Narrate { text: &'static str, seconds: f32 },
    CenterPrompt { text: &'static str, seconds: f32 },
    Speak(&'static str),
    Schedule { delay_seconds: f32, timer: RoomTimer },
    PlayCue(&'static str),
    SpawnHeart(HeartSpawn),
    ClearHeartGuard,
    ActivateKey,
    /// A possessed character pockets the key without opening the door.
    PocketKey,
    UnlockDoor,
    /// Scripted popup; closing it reports `PopupClosed(prop)` back to the room.
    ShowPopup {
        prop: PropKind,
        title: &'static str,
        body: &'static str,
    },
    MarkObjective(&'static str),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct RoomTransition {
    /// `None` means the room does not handle the action.
    pub(crate) outcome: Option<ActionOutcome>,
    pub(crate) effects: Vec<RoomEffect>,
}

impl RoomTransition {
    pub(crate) fn unhandled() -> Self {
        Self::default()
    }

    pub(crate) fn effects(effects: Vec<RoomEffect>) -> Self {
        Self {
            outcome: None,
            effects,
        }
    }

    pub(crate) fn outcome(outcome: ActionOutcome, effects: Vec<RoomEffect>) -> Self {
        Self {
            outcome: Some(outcome),
            effects,
        }
    }

    pub(crate) fn blocked(message: &str) -> Self {
        Self::outcome(ActionOutcome::blocked(message), Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RoomScript {
    Hallway(HallwayState),
    Labs(LabsState),
    Office(OfficeState),
    Chamber(ChamberState),
    /// Rooms without narrative logic: door, key and riddle only.
    Plain,
}

impl RoomScript {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "hallway" => Some(Self::Hallway(HallwayState::default())),
            "labs" => Some(Self::Labs(LabsState::default())),
            "office" => Some(Self::Office(OfficeState::default())),
            "chamber" => Some(Self::Chamber(ChamberState::default())),
            "plain" => Some(Self::Plain),
            _ => None,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Hallway(_) => "hallway",
            Self::Labs(_) => "labs",
            Self::Office(_) => "office",
            Self::Chamber(_) => "chamber",
            Self::Plain => "plain",
        }
    }

    /// Effects applied once when the world is built, before the player enters any room.
    pub(crate) fn setup(&self) -> Vec<RoomEffect> {
        match self {
            Self::Hallway(_) => hallway::setup(),
            Self::Labs(_) => Vec::new(),
            Self::Office(_) => office::setup(),
            Self::Chamber(_) => chamber::setup(),
            Self::Plain => Vec::new(),
        }
    }

    pub(crate) fn apply(&mut self, action: RoomAction<'_>) -> RoomTransition {
        match self {
            Self::Hallway(state) => state.apply(action),
            Self::Labs(state) => state.apply(action),
            Self::Office(state) => state.apply(action),
            Self::Chamber(state) => state.apply(action),
            Self::Plain => RoomTransition::unhandled(),
        }
    }

    /// One-line progress summary for the debug title and state dumps.
    pub(crate) fn stage(&self) -> String {
        match self {
            Self::Hallway(state) => state.stage(),
            Self::Labs(state) => state.stage(),
            Self::Office(state) => state.stage(),
            Self::Chamber(state) => state.stage(),
            Self::Plain => "plain".to_string(),
        }
    }
}

/// Advances a fixed-step animation counter. Returns true on the call that completes it.
pub(crate) fn advance_steps(
    accumulator: &mut f32,
    steps_done: &mut u32,
    dt_seconds: f32,
    step_seconds: f32,
    total_steps: u32,
) -> bool {
    if *steps_done >= total_steps {
        return false;
    }
    *accumulator += dt_seconds.max(0.0);
    while *accumulator + 1e-5 >= step_seconds && *steps_done < total_steps {
        *accumulator -= step_seconds;
        *steps_done += 1;
    }
    *steps_done >= total_steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_counter_completes_exactly_once() {
        let mut accumulator = 0.0;
        let mut steps = 0;
        let mut completions = 0;
        for _ in 0..200 {
            if advance_steps(&mut accumulator, &mut steps, 1.0 / 60.0, 0.1, 30) {
                completions += 1;
            }
        }
        assert_eq!(steps, 30);
        assert_eq!(completions, 1);
    }

    #[test]
    fn step_counter_needs_enough_time() {
        let mut accumulator = 0.0;
        let mut steps = 0;
        assert!(!advance_steps(&mut accumulator, &mut steps, 2.9, 0.1, 30));
        assert_eq!(steps, 29);
        assert!(advance_steps(&mut accumulator, &mut steps, 0.1, 0.1, 30));
    }

    #[test]
    fn script_names_resolve() {
        assert_eq!(RoomScript::from_name("office").map(|s| s.name()), Some("office"));
        assert!(RoomScript::from_name("ballroom").is_none());
        assert_eq!(RoomScript::Plain.apply(RoomAction::RiddleSolved), RoomTransition::unhandled());
    }
}
