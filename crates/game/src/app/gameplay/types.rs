use manor_engine::{Interactable, InteractionEligibility};
use serde::Serialize;

pub(crate) const DEFAULT_HEART_PROMPT: &str = "Press E to collect Heart Fragment";
pub(crate) const DEFAULT_LETTER_PROMPT: &str = "Press E to read the letter";
pub(crate) const DEFAULT_LETTER_REVISIT_PROMPT: &str = "Press E to revisit the letter";
pub(crate) const DEFAULT_LETTER_DISABLED_MESSAGE: &str = "The letter curls away from your touch.";
pub(crate) const DEFAULT_HEART_DISABLED_MESSAGE: &str = "The fragment recoils from your touch.";
pub(crate) const DEFAULT_HEART_COLLECT_MESSAGE: &str = "Heart Fragment collected.";
pub(crate) const NOT_AVAILABLE_MESSAGE: &str = "Not available yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PossessTarget {
    Candle(u8),
    Pendulum,
    Butler,
    GasValve,
    ExhaustFan,
    CookingPot,
}

impl PossessTarget {
    pub(crate) fn object_id(self) -> &'static str {
        match self {
            Self::Candle(1) => "candle_1",
            Self::Candle(2) => "candle_2",
            Self::Candle(_) => "candle_3",
            Self::Pendulum => "pendulum",
            Self::Butler => "butler",
            Self::GasValve => "gas_valve",
            Self::ExhaustFan => "exhaust_fan",
            Self::CookingPot => "cooking_pot",
        }
    }
}

/// Scripted props that respond to a plain interaction rather than a possession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PropKind {
    HeartRelic,
    FinalKey,
    FinalLetter,
    OrnateChest,
    CrackedMirror,
}

/// What a blueprint `<object id=...>` turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoomObject {
    Possessable(PossessTarget),
    Prop(PropKind),
}

impl RoomObject {
    pub(crate) fn from_object_id(id: &str) -> Option<Self> {
        let object = match id {
            "candle_1" => Self::Possessable(PossessTarget::Candle(1)),
            "candle_2" => Self::Possessable(PossessTarget::Candle(2)),
            "candle_3" => Self::Possessable(PossessTarget::Candle(3)),
            "pendulum" => Self::Possessable(PossessTarget::Pendulum),
            "butler" => Self::Possessable(PossessTarget::Butler),
            "gas_valve" => Self::Possessable(PossessTarget::GasValve),
            "exhaust_fan" => Self::Possessable(PossessTarget::ExhaustFan),
            "cooking_pot" => Self::Possessable(PossessTarget::CookingPot),
            "heart_relic" => Self::Prop(PropKind::HeartRelic),
            "final_key" => Self::Prop(PropKind::FinalKey),
            "final_letter" => Self::Prop(PropKind::FinalLetter),
            "ornate_chest" => Self::Prop(PropKind::OrnateChest),
            "cracked_mirror" => Self::Prop(PropKind::CrackedMirror),
            _ => return None,
        };
        Some(object)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct KeyState {
    pub(crate) room: usize,
    pub(crate) target_door: usize,
    pub(crate) active: bool,
    pub(crate) collected: bool,
    /// The ghost cannot lift this key itself; a possessed character has to.
    pub(crate) requires_possession: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DoorState {
    pub(crate) room: usize,
    pub(crate) locked: bool,
    pub(crate) next_room: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RiddleState {
    pub(crate) room: usize,
    pub(crate) question: String,
    pub(crate) answer: String,
    pub(crate) solved: bool,
}

/// Blocks collection and explains why. Checked before anything is mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CollectGuard {
    pub(crate) message: String,
    pub(crate) duration_seconds: f32,
    pub(crate) hint_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct HeartState {
    pub(crate) room: usize,
    pub(crate) collect_message: String,
    pub(crate) disabled_message: Option<String>,
    pub(crate) guard: Option<CollectGuard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct LetterState {
    pub(crate) room: usize,
    pub(crate) revisit_prompt: String,
    pub(crate) disabled_message: Option<String>,
    pub(crate) has_been_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum InteractableKind {
    Key(KeyState),
    Door(DoorState),
    Riddle(RiddleState),
    Possessable { room: usize, target: PossessTarget },
    Prop { room: usize, prop: PropKind },
    HeartFragment(HeartState),
    Letter(LetterState),
}

impl InteractableKind {
    pub(crate) fn room(&self) -> usize {
        match self {
            Self::Key(key) => key.room,
            Self::Door(door) => door.room,
            Self::Riddle(riddle) => riddle.room,
            Self::Possessable { room, .. } | Self::Prop { room, .. } => *room,
            Self::HeartFragment(heart) => heart.room,
            Self::Letter(letter) => letter.room,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Key(_) => "key",
            Self::Door(_) => "door",
            Self::Riddle(_) => "riddle",
            Self::Possessable { .. } => "possessable",
            Self::Prop { .. } => "prop",
            Self::HeartFragment(_) => "heart_fragment",
            Self::Letter(_) => "letter",
        }
    }
}

impl InteractionEligibility for InteractableKind {
    fn accepts_interaction(&self) -> bool {
        match self {
            Self::Key(key) => key.active && !key.collected,
            Self::Riddle(riddle) => !riddle.solved,
            _ => true,
        }
    }
}

/// Prompt shown while the entity is the interaction target, `None` hides the prompt.
pub(crate) fn prompt_for(entity: &Interactable<InteractableKind>) -> Option<String> {
    if !entity.enabled || !entity.visible {
        return None;
    }
    if let Some(prompt) = entity.prompt.as_deref().filter(|prompt| !prompt.is_empty()) {
        return Some(prompt.to_string());
    }
    let fallback = match &entity.kind {
        InteractableKind::Key(key) if key.active => "Press E to collect",
        InteractableKind::Key(_) => return None,
        InteractableKind::Door(door) if door.locked => "Press E to unlock",
        InteractableKind::Door(_) => "Press E to open",
        InteractableKind::Riddle(riddle) if !riddle.solved => "Press E to inspect",
        InteractableKind::Riddle(_) => return None,
        InteractableKind::Possessable { .. } | InteractableKind::Prop { .. } => {
            "Press E to interact"
        }
        InteractableKind::HeartFragment(_) => DEFAULT_HEART_PROMPT,
        InteractableKind::Letter(_) => DEFAULT_LETTER_PROMPT,
    };
    Some(fallback.to_string())
}

/// Result of a possession or scripted interaction, shown as a center prompt.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ActionOutcome {
    pub(crate) message: String,
    pub(crate) duration_seconds: f32,
}

impl ActionOutcome {
    pub(crate) fn new(message: impl Into<String>, duration_seconds: f32) -> Self {
        Self {
            message: message.into(),
            duration_seconds,
        }
    }

    /// An outcome that changes nothing but still tells the player what is missing.
    pub(crate) fn blocked(message: impl Into<String>) -> Self {
        Self::new(message, 2.0)
    }

    pub(crate) fn silent() -> Self {
        Self::new(String::new(), 0.0)
    }
}

#[cfg(test)]
mod tests {
    use manor_engine::{InteractableDesc, InteractableRegistry, Vec3};

    use super::*;

    fn key(active: bool, collected: bool) -> InteractableKind {
        InteractableKind::Key(KeyState {
            room: 0,
            target_door: 0,
            active,
            collected,
            requires_possession: false,
        })
    }

    #[test]
    fn keys_and_riddles_gate_their_own_eligibility() {
        assert!(!key(false, false).accepts_interaction());
        assert!(key(true, false).accepts_interaction());
        assert!(!key(true, true).accepts_interaction());

        let riddle = InteractableKind::Riddle(RiddleState {
            room: 0,
            question: "q".to_string(),
            answer: "a".to_string(),
            solved: true,
        });
        assert!(!riddle.accepts_interaction());
    }

    #[test]
    fn default_prompts_follow_kind() {
        let mut registry = InteractableRegistry::new();
        let door = registry.spawn(InteractableDesc::new(
            InteractableKind::Door(DoorState {
                room: 0,
                locked: true,
                next_room: Some(1),
            }),
            Vec3::ZERO,
        ));
        let entity = registry.get(door).expect("door");
        assert_eq!(prompt_for(entity).as_deref(), Some("Press E to unlock"));

        if let Some(entity) = registry.get_mut(door) {
            if let InteractableKind::Door(state) = &mut entity.kind {
                state.locked = false;
            }
        }
        let entity = registry.get(door).expect("door");
        assert_eq!(prompt_for(entity).as_deref(), Some("Press E to open"));

        registry.set_prompt(door, "Custom");
        let entity = registry.get(door).expect("door");
        assert_eq!(prompt_for(entity).as_deref(), Some("Custom"));

        registry.set_enabled(door, false);
        let entity = registry.get(door).expect("door");
        assert_eq!(prompt_for(entity), None);
    }

    #[test]
    fn object_ids_round_trip_through_room_object() {
        for target in [
            PossessTarget::Candle(1),
            PossessTarget::Candle(3),
            PossessTarget::Butler,
            PossessTarget::CookingPot,
        ] {
            assert_eq!(
                RoomObject::from_object_id(target.object_id()),
                Some(RoomObject::Possessable(target))
            );
        }
        assert_eq!(
            RoomObject::from_object_id("cracked_mirror"),
            Some(RoomObject::Prop(PropKind::CrackedMirror))
        );
        assert_eq!(RoomObject::from_object_id("chandelier"), None);
    }
}
