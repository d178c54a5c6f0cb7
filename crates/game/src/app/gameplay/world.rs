//! Mansion world: the interactable registry plus every room's runtime record.

use manor_engine::{
    AnchorOverride, HorizontalBounds, InteractableDesc, InteractableId, InteractableRegistry,
    KeyGate, LetterBlueprint, MansionBlueprint, Presenter, RoomBlueprint, TimerQueue, TimerScope,
    Vec3,
};
use thiserror::Error;
use tracing::{debug, info};

use super::hints::HintDispatcher;
use super::objectives::ObjectiveTracker;
use super::player::PlayerController;
use super::rewards::RewardBob;
use super::rooms::{RoomAction, RoomEffect, RoomScript, RoomTarget, RoomTimer};
use super::types::{
    ActionOutcome, DoorState, InteractableKind, KeyState, PropKind, RiddleState, RoomObject,
};

const WALL_MARGIN_X: f32 = 0.7;
const WALL_MARGIN_Z: f32 = 0.9;
/// Extra reach toward the door wall so the door stays inside interaction range.
const DOOR_SIDE_SLACK_Z: f32 = 0.6;
const SPAWN_OFFSET_Z: f32 = 4.0;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum WorldBuildError {
    #[error("room {room} ('{name}') uses unknown script '{script}'")]
    UnknownScript {
        room: usize,
        name: String,
        script: String,
    },
    #[error("room {room} ('{name}') declares unknown object '{object}'")]
    UnknownObject {
        room: usize,
        name: String,
        object: String,
    },
}

/// Which overlay currently owns the interact key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Overlay {
    Riddle(InteractableId),
    Letter(InteractableId),
    Scripted { room: usize, prop: PropKind },
}

#[derive(Debug)]
pub(crate) struct RoomRuntime {
    pub(crate) name: String,
    /// Floor center in world space.
    pub(crate) origin: Vec3,
    pub(crate) size: Vec3,
    pub(crate) bounds: HorizontalBounds,
    pub(crate) door: InteractableId,
    pub(crate) key: InteractableId,
    pub(crate) key_gate: KeyGate,
    pub(crate) riddle: Option<InteractableId>,
    pub(crate) heart: Option<InteractableId>,
    pub(crate) letter: Option<InteractableId>,
    pub(crate) objects: Vec<(String, InteractableId)>,
    pub(crate) heart_anchor: AnchorOverride,
    pub(crate) letter_anchor: AnchorOverride,
    pub(crate) letter_content: LetterBlueprint,
    pub(crate) next_room: Option<usize>,
    pub(crate) reset_on_enter: bool,
    pub(crate) visited: bool,
    pub(crate) seconds_in_room: f32,
    pub(crate) script: RoomScript,
}

impl RoomRuntime {
    pub(crate) fn floor_y(&self) -> f32 {
        self.origin.y
    }

    pub(crate) fn center(&self) -> Vec3 {
        self.origin + Vec3::new(0.0, self.size.y / 2.0, 0.0)
    }

    pub(crate) fn spawn_point(&self) -> Vec3 {
        self.origin + Vec3::new(0.0, 0.0, SPAWN_OFFSET_Z)
    }

    pub(crate) fn to_local(&self, world: Vec3) -> Vec3 {
        world - self.origin
    }

    pub(crate) fn object(&self, id: &str) -> Option<InteractableId> {
        self.objects
            .iter()
            .find(|(object_id, _)| object_id == id)
            .map(|(_, id)| *id)
    }

    pub(crate) fn target(&self, target: RoomTarget) -> Option<InteractableId> {
        match target {
            RoomTarget::Object(id) => self.object(id),
            RoomTarget::Key => Some(self.key),
            RoomTarget::Riddle => self.riddle,
            RoomTarget::Heart => self.heart,
        }
    }
}

#[derive(Debug)]
pub(crate) struct MansionWorld {
    pub(crate) registry: InteractableRegistry<InteractableKind>,
    pub(crate) rooms: Vec<RoomRuntime>,
    pub(crate) active_room: usize,
    pub(crate) player: PlayerController,
    pub(crate) timers: TimerQueue<RoomTimer>,
    pub(crate) hints: HintDispatcher,
    pub(crate) objectives: ObjectiveTracker,
    pub(crate) bobs: Vec<RewardBob>,
    pub(crate) overlay: Option<Overlay>,
    pub(crate) hovered: Option<InteractableId>,
    pub(crate) game_over: bool,
}

impl MansionWorld {
    pub(crate) fn from_blueprint(blueprint: &MansionBlueprint) -> Result<Self, WorldBuildError> {
        let mut registry = InteractableRegistry::new();
        let mut rooms = Vec::with_capacity(blueprint.room_count());
        for (index, room) in blueprint.rooms.iter().enumerate() {
            rooms.push(build_room(index, room, &mut registry)?);
        }

        let mut world = Self {
            registry,
            hints: HintDispatcher::new(rooms.len()),
            objectives: ObjectiveTracker::from_blueprint(blueprint),
            rooms,
            active_room: 0,
            player: PlayerController::default(),
            timers: TimerQueue::new(),
            bobs: Vec::new(),
            overlay: None,
            hovered: None,
            game_over: false,
        };
        for room in 0..world.rooms.len() {
            for effect in world.rooms[room].script.setup() {
                world.apply_static_effect(room, &effect);
            }
        }
        if let Some(first) = world.rooms.first() {
            world.player.teleport(first.spawn_point());
        }
        info!(
            rooms = world.rooms.len(),
            interactables = world.registry.len(),
            "mansion_world_built"
        );
        Ok(world)
    }

    pub(crate) fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub(crate) fn active(&self) -> Option<&RoomRuntime> {
        self.rooms.get(self.active_room)
    }

    /// Registry-only effects. Returns false for effects that need the presenter.
    pub(crate) fn apply_static_effect(&mut self, room: usize, effect: &RoomEffect) -> bool {
        let Some(runtime) = self.rooms.get(room) else {
            return false;
        };
        let (target, applied) = match effect {
            RoomEffect::SetEnabled(target, enabled) => (
                *target,
                runtime
                    .target(*target)
                    .is_some_and(|id| self.registry.set_enabled(id, *enabled)),
            ),
            RoomEffect::SetVisible(target, visible) => (
                *target,
                runtime
                    .target(*target)
                    .is_some_and(|id| self.registry.set_visible(id, *visible)),
            ),
            RoomEffect::SetPrompt(target, prompt) => (
                *target,
                runtime
                    .target(*target)
                    .is_some_and(|id| self.registry.set_prompt(id, *prompt)),
            ),
            _ => return false,
        };
        if !applied {
            debug!(room, target = ?target, "room_effect_target_missing");
        }
        true
    }

    /// Runs one action through the room's state machine and applies its effects.
    pub(crate) fn run_room_action(
        &mut self,
        room: usize,
        action: RoomAction<'_>,
        presenter: &mut dyn Presenter,
    ) -> Option<ActionOutcome> {
        let transition = self.rooms.get_mut(room)?.script.apply(action);
        self.apply_effects(room, transition.effects, presenter);
        transition.outcome
    }

    pub(crate) fn tick_room(&mut self, room: usize, dt_seconds: f32, presenter: &mut dyn Presenter) {
        let player_position = self.player.position();
        let transition = {
            let Some(runtime) = self.rooms.get_mut(room) else {
                return;
            };
            runtime.seconds_in_room += dt_seconds;
            let action = RoomAction::Tick {
                dt_seconds,
                seconds_in_room: runtime.seconds_in_room,
                player_local: runtime.to_local(player_position),
                shown: self.hints.shown(room),
            };
            runtime.script.apply(action)
        };
        self.apply_effects(room, transition.effects, presenter);
    }

    pub(crate) fn fire_due_timers(&mut self, dt_seconds: f32, presenter: &mut dyn Presenter) {
        for (scope, timer) in self.timers.advance(dt_seconds) {
            let room = scope.0 as usize;
            debug!(room, timer = ?timer, "room_timer_fired");
            if let Some(outcome) =
                self.run_room_action(room, RoomAction::Timer(timer), presenter)
            {
                show_outcome(&outcome, presenter);
            }
        }
    }

    pub(crate) fn apply_effects(
        &mut self,
        room: usize,
        effects: Vec<RoomEffect>,
        presenter: &mut dyn Presenter,
    ) {
        for effect in effects {
            if self.apply_static_effect(room, &effect) {
                continue;
            }
            match effect {
                RoomEffect::Hint { text, seconds, key } => {
                    self.hints.show_hint(room, text, seconds, key, presenter);
                }
                RoomEffect::Narrate { text, seconds } => {
                    self.hints.narrate(text, seconds, presenter);
                }
                RoomEffect::CenterPrompt { text, seconds } => {
                    presenter.show_center_prompt(text, seconds);
                }
                RoomEffect::Speak(text) => self.hints.speak(text, presenter),
                RoomEffect::Schedule {
                    delay_seconds,
                    timer,
                } => {
                    let handle = self
                        .timers
                        .schedule(delay_seconds, room_scope(room), timer);
                    debug!(room, delay_seconds, timer = ?timer, handle = ?handle, "room_timer_scheduled");
                }
                RoomEffect::PlayCue(cue) => presenter.play_cue(cue),
                RoomEffect::SpawnHeart(spawn) => {
                    self.spawn_heart_fragment(room, spawn, presenter);
                }
                RoomEffect::ClearHeartGuard => self.clear_heart_guard(room),
                RoomEffect::ActivateKey => {
                    self.activate_key(room);
                }
                RoomEffect::PocketKey => {
                    self.pocket_key(room, presenter);
                }
                RoomEffect::UnlockDoor => {
                    self.unlock_door(room, presenter);
                }
                RoomEffect::ShowPopup { prop, title, body } => {
                    presenter.show_popup(title, body);
                    self.overlay = Some(Overlay::Scripted { room, prop });
                }
                RoomEffect::MarkObjective(id) => {
                    self.mark_objective(room, id, presenter);
                }
                RoomEffect::SetEnabled(..)
                | RoomEffect::SetVisible(..)
                | RoomEffect::SetPrompt(..) => {}
            }
        }
    }

    pub(crate) fn mark_objective(
        &mut self,
        room: usize,
        id: &str,
        presenter: &mut dyn Presenter,
    ) -> bool {
        let on_screen = room == self.active_room;
        self.objectives.mark(room, id, on_screen, presenter)
    }
}

pub(crate) fn room_scope(room: usize) -> TimerScope {
    TimerScope(room as u32)
}

pub(crate) fn show_outcome(outcome: &ActionOutcome, presenter: &mut dyn Presenter) {
    if !outcome.message.is_empty() {
        presenter.show_center_prompt(&outcome.message, outcome.duration_seconds);
    }
}

fn build_room(
    index: usize,
    room: &RoomBlueprint,
    registry: &mut InteractableRegistry<InteractableKind>,
) -> Result<RoomRuntime, WorldBuildError> {
    let script = RoomScript::from_name(&room.script).ok_or_else(|| WorldBuildError::UnknownScript {
        room: index,
        name: room.name.clone(),
        script: room.script.clone(),
    })?;

    let origin = room.position;
    let center = origin + Vec3::new(0.0, room.size.y / 2.0, 0.0);
    let mut bounds =
        HorizontalBounds::from_center_size(center, room.size, WALL_MARGIN_X, WALL_MARGIN_Z);
    bounds.min_z -= DOOR_SIDE_SLACK_Z;

    let door = registry.spawn(InteractableDesc::new(
        InteractableKind::Door(DoorState {
            room: index,
            locked: true,
            next_room: room.next_room,
        }),
        origin + room.door,
    ));
    let key = registry.spawn(
        InteractableDesc::new(
            InteractableKind::Key(KeyState {
                room: index,
                target_door: index,
                active: false,
                collected: false,
                requires_possession: room.key.gate == KeyGate::Possession,
            }),
            origin + room.key.position,
        )
        .with_range(room.key.range),
    );
    let riddle = room.riddle.as_ref().map(|riddle| {
        registry.spawn(
            InteractableDesc::new(
                InteractableKind::Riddle(RiddleState {
                    room: index,
                    question: riddle.question.clone(),
                    answer: riddle.answer.clone(),
                    solved: false,
                }),
                origin + riddle.position,
            )
            .with_range(riddle.range),
        )
    });

    let mut objects = Vec::with_capacity(room.objects.len());
    for object in &room.objects {
        let kind = match RoomObject::from_object_id(&object.id) {
            Some(RoomObject::Possessable(target)) => InteractableKind::Possessable {
                room: index,
                target,
            },
            Some(RoomObject::Prop(prop)) => InteractableKind::Prop { room: index, prop },
            None => {
                return Err(WorldBuildError::UnknownObject {
                    room: index,
                    name: room.name.clone(),
                    object: object.id.clone(),
                })
            }
        };
        let id = registry.spawn(
            InteractableDesc::new(kind, origin + object.position).with_range(object.range),
        );
        objects.push((object.id.clone(), id));
    }

    debug!(room = index, script = script.name(), objects = objects.len(), "room_built");
    Ok(RoomRuntime {
        name: room.name.clone(),
        origin,
        size: room.size,
        bounds,
        door,
        key,
        key_gate: room.key.gate,
        riddle,
        heart: None,
        letter: None,
        objects,
        heart_anchor: room.heart_anchor,
        letter_anchor: room.letter_anchor,
        letter_content: room.letter.clone(),
        next_room: room.next_room,
        reset_on_enter: room.reset_on_enter,
        visited: false,
        seconds_in_room: 0.0,
        script,
    })
}

#[cfg(test)]
mod tests {
    use manor_engine::{builtin_mansion_blueprint, compile_mansion_blueprint};

    use super::*;

    #[test]
    fn builtin_world_registers_every_room_entity() {
        let blueprint = builtin_mansion_blueprint().expect("builtin blueprint");
        let world = MansionWorld::from_blueprint(&blueprint).expect("world");
        assert_eq!(world.room_count(), 4);
        // door + key per room, two riddles, 5 + 3 + 5 objects.
        assert_eq!(world.registry.len(), 4 * 2 + 2 + 13);
        assert_eq!(world.player.position(), Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn setup_effects_gate_initial_objects() {
        let blueprint = builtin_mansion_blueprint().expect("builtin blueprint");
        let world = MansionWorld::from_blueprint(&blueprint).expect("world");
        let hallway = &world.rooms[0];
        let riddle = hallway.riddle.and_then(|id| world.registry.get(id)).expect("riddle");
        assert!(!riddle.enabled && !riddle.visible);
        let key = world.registry.get(hallway.key).expect("key");
        assert!(!key.visible);

        let office = &world.rooms[2];
        let pot = office
            .object("cooking_pot")
            .and_then(|id| world.registry.get(id))
            .expect("pot");
        assert!(!pot.enabled);
        assert_eq!(pot.prompt.as_deref(), Some("Chef is blocking the pot"));
    }

    #[test]
    fn bounds_reach_toward_the_door() {
        let blueprint = builtin_mansion_blueprint().expect("builtin blueprint");
        let world = MansionWorld::from_blueprint(&blueprint).expect("world");
        let hallway = &world.rooms[0];
        assert!((hallway.bounds.min_z - (-6.6 + 0.9 - 0.6)).abs() < 1e-4);
        assert!((hallway.bounds.max_x - (4.6 - 0.7)).abs() < 1e-4);
        assert!((hallway.center().y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn unknown_script_is_rejected() {
        let raw = r#"<Mansion>
  <Room name="Attic" script="attic">
    <position x="0" y="0" z="0"/>
    <size x="4" y="3" z="4"/>
    <door x="0" y="1" z="-1.9"/>
    <key x="0" y="0.5" z="0" gate="chain"/>
    <letter title="Note">Dust.</letter>
  </Room>
</Mansion>"#;
        let blueprint = compile_mansion_blueprint(std::path::Path::new("attic.xml"), raw).expect("compiles");
        let error = MansionWorld::from_blueprint(&blueprint).expect_err("unknown script");
        assert!(matches!(error, WorldBuildError::UnknownScript { .. }));
    }
}
