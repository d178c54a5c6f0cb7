use serde::Serialize;

use crate::app::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyGate {
    /// Key activates as soon as the room riddle is solved.
    Riddle,
    /// Key is activated by the room script at the end of its chain.
    Chain,
    /// Key is visible but can only be taken by a possessed character.
    Possession,
}

impl KeyGate {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "riddle" => Some(Self::Riddle),
            "chain" => Some(Self::Chain),
            "possession" => Some(Self::Possession),
            _ => None,
        }
    }
}

/// Partial reward placement; unset fields fall through to the next layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnchorOverride {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
    pub relative_to_floor: Option<bool>,
    pub rotation_y: Option<f32>,
    pub bob_amplitude: Option<f32>,
    pub bob_speed: Option<f32>,
    pub scale: Option<f32>,
}

impl AnchorOverride {
    /// Field-wise merge where `self` wins over `base`.
    pub fn over(&self, base: &AnchorOverride) -> AnchorOverride {
        AnchorOverride {
            x: self.x.or(base.x),
            y: self.y.or(base.y),
            z: self.z.or(base.z),
            relative_to_floor: self.relative_to_floor.or(base.relative_to_floor),
            rotation_y: self.rotation_y.or(base.rotation_y),
            bob_amplitude: self.bob_amplitude.or(base.bob_amplitude),
            bob_speed: self.bob_speed.or(base.bob_speed),
            scale: self.scale.or(base.scale),
        }
    }
}

/// Positions inside a room are offsets from the room center; `y` is height above the floor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyBlueprint {
    pub position: Vec3,
    pub gate: KeyGate,
    pub range: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiddleBlueprint {
    pub question: String,
    pub answer: String,
    pub position: Vec3,
    pub range: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectBlueprint {
    pub id: String,
    pub position: Vec3,
    pub range: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveBlueprint {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetterBlueprint {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomBlueprint {
    pub name: String,
    pub script: String,
    pub position: Vec3,
    pub size: Vec3,
    pub door: Vec3,
    pub key: KeyBlueprint,
    pub riddle: Option<RiddleBlueprint>,
    pub next_room: Option<usize>,
    pub reset_on_enter: bool,
    pub heart_anchor: AnchorOverride,
    pub letter_anchor: AnchorOverride,
    pub objects: Vec<ObjectBlueprint>,
    pub objectives: Vec<ObjectiveBlueprint>,
    pub letter: LetterBlueprint,
}

impl RoomBlueprint {
    pub fn object(&self, id: &str) -> Option<&ObjectBlueprint> {
        self.objects.iter().find(|object| object.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MansionBlueprint {
    pub rooms: Vec<RoomBlueprint>,
}

impl MansionBlueprint {
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_fields_win_and_gaps_fall_through() {
        let base = AnchorOverride {
            x: Some(1.4),
            y: Some(0.05),
            z: Some(1.4),
            relative_to_floor: Some(true),
            bob_speed: Some(1.6),
            ..AnchorOverride::default()
        };
        let explicit = AnchorOverride {
            y: Some(2.0),
            relative_to_floor: Some(false),
            scale: Some(3.0),
            ..AnchorOverride::default()
        };

        let merged = explicit.over(&base);
        assert_eq!(merged.x, Some(1.4));
        assert_eq!(merged.y, Some(2.0));
        assert_eq!(merged.relative_to_floor, Some(false));
        assert_eq!(merged.bob_speed, Some(1.6));
        assert_eq!(merged.scale, Some(3.0));
        assert_eq!(merged.rotation_y, None);
    }

    #[test]
    fn key_gate_tokens() {
        assert_eq!(KeyGate::from_token("chain"), Some(KeyGate::Chain));
        assert_eq!(KeyGate::from_token("Chain"), None);
    }
}
