//! Heart fragment and letter rewards: anchor resolution, replace-on-spawn, collection,
//! first-read tracking, and the idle bob.

use std::f32::consts::PI;

use manor_engine::{AnchorOverride, InteractableDesc, InteractableId, Presenter, Vec3};
use serde::Serialize;
use tracing::info;

use super::rooms::{HeartSpawn, LetterSpawn, RoomAction};
use super::types::{
    CollectGuard, HeartState, InteractableKind, LetterState, DEFAULT_HEART_COLLECT_MESSAGE,
    DEFAULT_HEART_DISABLED_MESSAGE, DEFAULT_LETTER_DISABLED_MESSAGE,
    DEFAULT_LETTER_REVISIT_PROMPT,
};
use super::world::{show_outcome, MansionWorld, Overlay, RoomRuntime};

const HEART_RANGE: f32 = 2.8;
const LETTER_RANGE: f32 = 2.6;
const HEART_APPEARS_MESSAGE: &str = "A Heart Fragment appears!";

const HEART_DEFAULTS: AnchorOverride = AnchorOverride {
    x: Some(1.4),
    y: Some(0.05),
    z: Some(1.4),
    relative_to_floor: Some(true),
    rotation_y: Some(PI),
    bob_amplitude: Some(0.12),
    bob_speed: Some(1.8),
    scale: Some(3.0),
};

const LETTER_DEFAULTS: AnchorOverride = AnchorOverride {
    x: Some(1.4),
    y: Some(0.05),
    z: Some(1.4),
    relative_to_floor: Some(true),
    rotation_y: Some(0.0),
    bob_amplitude: Some(0.05),
    bob_speed: Some(1.4),
    scale: Some(1.0),
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct ResolvedAnchor {
    pub(crate) position: Vec3,
    pub(crate) rotation_y: f32,
    pub(crate) bob_amplitude: f32,
    pub(crate) bob_speed: f32,
    pub(crate) scale: f32,
}

/// Idle vertical bob of a spawned reward, independent of its interaction state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RewardBob {
    pub(crate) id: InteractableId,
    pub(crate) base_y: f32,
    pub(crate) amplitude: f32,
    pub(crate) speed: f32,
    pub(crate) phase: f32,
    pub(crate) rotation_y: f32,
    pub(crate) scale: f32,
}

/// Merges `explicit` over the room anchor over `defaults`, then places it in the room.
/// Floor-relative anchors measure y from the floor, the rest from the room's center.
pub(crate) fn resolve_anchor(
    room: &RoomRuntime,
    explicit: &AnchorOverride,
    room_anchor: &AnchorOverride,
    defaults: &AnchorOverride,
) -> ResolvedAnchor {
    let merged = explicit.over(room_anchor).over(defaults);
    let base_y = if merged.relative_to_floor.unwrap_or(true) {
        room.floor_y()
    } else {
        room.center().y
    };
    ResolvedAnchor {
        position: Vec3::new(
            room.origin.x + merged.x.unwrap_or_default(),
            base_y + merged.y.unwrap_or_default(),
            room.origin.z + merged.z.unwrap_or_default(),
        ),
        rotation_y: merged.rotation_y.unwrap_or_default(),
        bob_amplitude: merged.bob_amplitude.unwrap_or_default(),
        bob_speed: merged.bob_speed.unwrap_or_default(),
        scale: merged.scale.unwrap_or(1.0),
    }
}

impl MansionWorld {
    /// Replaces the room's heart fragment (and, when asked, its letter).
    pub(crate) fn spawn_heart_fragment(
        &mut self,
        room: usize,
        spawn: HeartSpawn,
        presenter: &mut dyn Presenter,
    ) -> Option<(InteractableId, Option<InteractableId>)> {
        let runtime = self.rooms.get(room)?;
        let anchor = resolve_anchor(runtime, &spawn.anchor, &runtime.heart_anchor, &HEART_DEFAULTS);
        let previous = runtime.heart;

        let replaced = previous.is_some_and(|id| self.remove_reward(id));
        let mut desc = InteractableDesc::new(
            InteractableKind::HeartFragment(HeartState {
                room,
                collect_message: spawn
                    .collect_message
                    .unwrap_or_else(|| DEFAULT_HEART_COLLECT_MESSAGE.to_string()),
                disabled_message: None,
                guard: spawn.guard.map(|guard| CollectGuard {
                    message: guard.message.to_string(),
                    duration_seconds: guard.duration_seconds,
                    hint_key: guard.hint_key.map(str::to_string),
                }),
            }),
            anchor.position,
        )
        .with_range(Some(HEART_RANGE));
        if let Some(prompt) = spawn.prompt {
            desc = desc.with_prompt(prompt);
        }
        let heart = self.registry.spawn(desc);
        self.track_bob(heart, anchor);
        if let Some(runtime) = self.rooms.get_mut(room) {
            runtime.heart = Some(heart);
        }
        info!(room, heart = heart.0, replaced, "heart_fragment_spawned");

        if !spawn.silent {
            presenter.show_center_prompt(HEART_APPEARS_MESSAGE, 3.0);
        }
        let letter = spawn
            .letter
            .and_then(|letter| self.spawn_letter(room, letter));
        Some((heart, letter))
    }

    pub(crate) fn spawn_letter(&mut self, room: usize, spawn: LetterSpawn) -> Option<InteractableId> {
        let runtime = self.rooms.get(room)?;
        let anchor =
            resolve_anchor(runtime, &spawn.anchor, &runtime.letter_anchor, &LETTER_DEFAULTS);
        let previous = runtime.letter;

        let replaced = previous.is_some_and(|id| self.remove_reward(id));
        let mut desc = InteractableDesc::new(
            InteractableKind::Letter(LetterState {
                room,
                revisit_prompt: spawn
                    .revisit_prompt
                    .unwrap_or_else(|| DEFAULT_LETTER_REVISIT_PROMPT.to_string()),
                disabled_message: None,
                has_been_read: false,
            }),
            anchor.position,
        )
        .with_range(Some(LETTER_RANGE));
        if let Some(prompt) = spawn.prompt {
            desc = desc.with_prompt(prompt);
        }
        let letter = self.registry.spawn(desc);
        self.track_bob(letter, anchor);
        if let Some(runtime) = self.rooms.get_mut(room) {
            runtime.letter = Some(letter);
        }
        info!(room, letter = letter.0, replaced, "letter_spawned");
        Some(letter)
    }

    pub(crate) fn clear_heart_guard(&mut self, room: usize) {
        let Some(heart) = self.rooms.get(room).and_then(|runtime| runtime.heart) else {
            return;
        };
        if let Some(InteractableKind::HeartFragment(state)) =
            self.registry.get_mut(heart).map(|entity| &mut entity.kind)
        {
            state.guard = None;
            info!(room, "heart_guard_cleared");
        }
    }

    /// Returns true when the fragment was collected. A blocking guard is checked before
    /// anything changes, so a refused attempt only shows its message.
    pub(crate) fn collect_heart(&mut self, id: InteractableId, presenter: &mut dyn Presenter) -> bool {
        let Some(entity) = self.registry.get(id) else {
            return false;
        };
        let InteractableKind::HeartFragment(state) = &entity.kind else {
            return false;
        };
        let room = state.room;
        if !entity.enabled {
            let message = state
                .disabled_message
                .clone()
                .unwrap_or_else(|| DEFAULT_HEART_DISABLED_MESSAGE.to_string());
            presenter.show_center_prompt(&message, 3.0);
            return false;
        }
        if let Some(guard) = state.guard.clone() {
            info!(room, heart = id.0, "heart_collect_blocked");
            // The keyed hint speaks once; later attempts still get the prompt.
            let hinted = self.hints.show_hint(
                room,
                &guard.message,
                guard.duration_seconds,
                guard.hint_key.as_deref(),
                presenter,
            );
            if !hinted {
                presenter.show_center_prompt(&guard.message, guard.duration_seconds);
            }
            return false;
        }
        let collect_message = state.collect_message.clone();

        self.mark_objective(room, "collect-heart", presenter);
        presenter.show_center_prompt(&collect_message, 3.0);
        self.remove_reward(id);
        if let Some(runtime) = self.rooms.get_mut(room) {
            if runtime.heart == Some(id) {
                runtime.heart = None;
            }
        }
        info!(room, heart = id.0, "heart_fragment_collected");
        if let Some(outcome) = self.run_room_action(room, RoomAction::HeartCollected, presenter) {
            show_outcome(&outcome, presenter);
        }
        true
    }

    pub(crate) fn open_letter(&mut self, id: InteractableId, presenter: &mut dyn Presenter) -> bool {
        let Some(entity) = self.registry.get(id) else {
            return false;
        };
        let InteractableKind::Letter(state) = &entity.kind else {
            return false;
        };
        if !entity.enabled {
            let message = state
                .disabled_message
                .clone()
                .unwrap_or_else(|| DEFAULT_LETTER_DISABLED_MESSAGE.to_string());
            presenter.show_center_prompt(&message, 3.0);
            return false;
        }
        let Some(runtime) = self.rooms.get(state.room) else {
            return false;
        };
        presenter.show_popup(&runtime.letter_content.title, &runtime.letter_content.body);
        self.overlay = Some(Overlay::Letter(id));
        true
    }

    /// Closes the letter popup. The first close marks the letter read and notifies the room.
    pub(crate) fn close_letter(&mut self, id: InteractableId, presenter: &mut dyn Presenter) {
        presenter.close_popup();
        self.overlay = None;

        let Some(entity) = self.registry.get_mut(id) else {
            return;
        };
        let InteractableKind::Letter(state) = &mut entity.kind else {
            return;
        };
        if state.has_been_read {
            return;
        }
        state.has_been_read = true;
        let room = state.room;
        entity.prompt = Some(state.revisit_prompt.clone());
        info!(room, letter = id.0, "letter_first_read");

        self.mark_objective(room, "read-letter", presenter);
        if let Some(outcome) = self.run_room_action(room, RoomAction::LetterRead, presenter) {
            show_outcome(&outcome, presenter);
        }
    }

    pub(crate) fn advance_bobs(&mut self, dt_seconds: f32) {
        for bob in &mut self.bobs {
            bob.phase += dt_seconds * bob.speed;
            if let Some(entity) = self.registry.get_mut(bob.id) {
                entity.position.y = bob.base_y + bob.phase.sin() * bob.amplitude;
            }
        }
    }

    fn track_bob(&mut self, id: InteractableId, anchor: ResolvedAnchor) {
        self.bobs.push(RewardBob {
            id,
            base_y: anchor.position.y,
            amplitude: anchor.bob_amplitude,
            speed: anchor.bob_speed,
            phase: 0.0,
            rotation_y: anchor.rotation_y,
            scale: anchor.scale,
        });
    }

    fn remove_reward(&mut self, id: InteractableId) -> bool {
        self.bobs.retain(|bob| bob.id != id);
        self.registry.unregister(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use manor_engine::{builtin_mansion_blueprint, PresentationLog};

    use super::super::rooms::GuardSpec;
    use super::*;

    fn world() -> MansionWorld {
        let blueprint = builtin_mansion_blueprint().expect("builtin blueprint");
        MansionWorld::from_blueprint(&blueprint).expect("world")
    }

    fn hearts_in_room(world: &MansionWorld, room: usize) -> usize {
        world
            .registry
            .iter()
            .filter(|entity| {
                matches!(&entity.kind, InteractableKind::HeartFragment(state) if state.room == room)
            })
            .count()
    }

    #[test]
    fn anchors_merge_explicit_over_room_over_defaults() {
        let world = world();
        let office = &world.rooms[2];
        let explicit = AnchorOverride {
            x: Some(0.5),
            ..AnchorOverride::default()
        };
        let anchor = resolve_anchor(office, &explicit, &office.heart_anchor, &HEART_DEFAULTS);
        assert!((anchor.position.x - 0.5).abs() < 1e-5);
        assert!((anchor.position.y - 1.2).abs() < 1e-5);
        assert!((anchor.position.z - (-30.0 + 2.4)).abs() < 1e-5);
        assert!((anchor.scale - 3.0).abs() < 1e-5);

        let centered = AnchorOverride {
            relative_to_floor: Some(false),
            y: Some(0.5),
            ..AnchorOverride::default()
        };
        let anchor = resolve_anchor(office, &centered, &AnchorOverride::default(), &HEART_DEFAULTS);
        assert!((anchor.position.y - 4.5).abs() < 1e-5);
        assert!((anchor.rotation_y - PI).abs() < 1e-5);
    }

    #[test]
    fn spawning_twice_leaves_one_heart_and_one_letter() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        let spawn = || HeartSpawn {
            letter: Some(LetterSpawn::default()),
            ..HeartSpawn::default()
        };
        let (first, _) = world
            .spawn_heart_fragment(1, spawn(), &mut presenter)
            .expect("spawned");
        let (second, letter) = world
            .spawn_heart_fragment(1, spawn(), &mut presenter)
            .expect("spawned");
        assert_ne!(first, second);
        assert!(!world.registry.contains(first));
        assert_eq!(hearts_in_room(&world, 1), 1);
        assert_eq!(world.rooms[1].letter, letter);
        let letters = world
            .registry
            .iter()
            .filter(|entity| matches!(entity.kind, InteractableKind::Letter(_)))
            .count();
        assert_eq!(letters, 1);
        assert_eq!(world.bobs.len(), 2);
        assert_eq!(
            presenter.center_prompts(),
            vec![HEART_APPEARS_MESSAGE, HEART_APPEARS_MESSAGE]
        );
    }

    #[test]
    fn guarded_heart_stays_until_guard_clears() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        let (heart, _) = world
            .spawn_heart_fragment(
                2,
                HeartSpawn {
                    guard: Some(GuardSpec {
                        message: "Read the letter first.",
                        duration_seconds: 7.0,
                        hint_key: None,
                    }),
                    silent: true,
                    ..HeartSpawn::default()
                },
                &mut presenter,
            )
            .expect("spawned");

        assert!(!world.collect_heart(heart, &mut presenter));
        assert!(world.registry.get(heart).is_some_and(|entity| entity.visible));
        assert_eq!(presenter.last_center_prompt(), Some("Read the letter first."));
        assert!(!world.objectives.is_done(2, "collect-heart"));

        world.clear_heart_guard(2);
        assert!(world.collect_heart(heart, &mut presenter));
        assert!(!world.registry.contains(heart));
        assert_eq!(world.rooms[2].heart, None);
        assert!(world.objectives.is_done(2, "collect-heart"));
    }

    #[test]
    fn letter_first_close_switches_to_revisit_prompt_once() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        let letter = world
            .spawn_letter(
                1,
                LetterSpawn::with_prompts("Press E to read the note", "Press E to reread the note"),
            )
            .expect("letter");

        assert!(world.open_letter(letter, &mut presenter));
        assert_eq!(world.overlay, Some(Overlay::Letter(letter)));
        world.close_letter(letter, &mut presenter);
        assert_eq!(world.overlay, None);
        let prompt = world.registry.get(letter).and_then(|entity| entity.prompt.clone());
        assert_eq!(prompt.as_deref(), Some("Press E to reread the note"));
        assert!(world.objectives.is_done(1, "read-letter"));

        let hints_before = world.hints.shown(1).len();
        world.open_letter(letter, &mut presenter);
        world.close_letter(letter, &mut presenter);
        assert_eq!(world.hints.shown(1).len(), hints_before);
    }

    #[test]
    fn bob_follows_sine_of_accumulated_phase() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        let (heart, _) = world
            .spawn_heart_fragment(3, HeartSpawn::default(), &mut presenter)
            .expect("spawned");
        let base_y = world.registry.get(heart).map(|entity| entity.position.y).expect("heart");
        world.advance_bobs(0.5);
        let bob = world.bobs.iter().find(|bob| bob.id == heart).expect("bob");
        let expected = base_y + (0.5 * bob.speed).sin() * bob.amplitude;
        let actual = world.registry.get(heart).map(|entity| entity.position.y).expect("heart");
        assert!((actual - expected).abs() < 1e-5);
    }
}
