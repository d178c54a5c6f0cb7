//! Room progression graph: doors, keys, riddles, and room-to-room transitions.

use manor_engine::{InteractableId, KeyGate, Presenter, DEFAULT_CENTER_PROMPT_SECONDS};
use tracing::{debug, info, warn};

use super::rooms::RoomAction;
use super::types::InteractableKind;
use super::world::{room_scope, show_outcome, MansionWorld, Overlay};

const POSSESSION_KEY_MESSAGE: &str = "You cannot pick up the key. Possess the butler to pick it up.";
const RIDDLE_TITLE: &str = "Riddle";
const RIDDLE_WRONG_MESSAGE: &str = "The relic rejects your answer.";
const RIDDLE_KEY_MESSAGE: &str = "The glass box unlocks. Take the key.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TitlePolicy {
    FirstVisit,
    Always,
}

impl MansionWorld {
    /// Locked -> Unlocked, once. Later calls change nothing and present nothing.
    pub(crate) fn unlock_door(&mut self, room: usize, presenter: &mut dyn Presenter) -> bool {
        let Some(runtime) = self.rooms.get(room) else {
            return false;
        };
        let door = runtime.door;
        let name = runtime.name.clone();
        if !self.set_door_locked(door, false) {
            return false;
        }
        info!(room, "door_unlocked");
        presenter.play_cue("door_unlock");
        presenter.show_center_prompt(&format!("{name} door unlocked."), DEFAULT_CENTER_PROMPT_SECONDS);
        true
    }

    /// Picks up an active key and unlocks its door. Inactive or already collected keys are a
    /// no-op, as are keys only a possessed character can lift.
    pub(crate) fn collect_key(&mut self, key: InteractableId, presenter: &mut dyn Presenter) -> bool {
        let Some(entity) = self.registry.get_mut(key) else {
            return false;
        };
        let InteractableKind::Key(state) = &mut entity.kind else {
            return false;
        };
        if !state.active || state.collected {
            return false;
        }
        if state.requires_possession {
            presenter.show_center_prompt(POSSESSION_KEY_MESSAGE, 8.0);
            return false;
        }
        state.active = false;
        state.collected = true;
        let room = state.room;
        let target_door = state.target_door;
        entity.visible = false;
        info!(room, target_door, "key_collected");

        self.unlock_door(target_door, presenter);
        if let Some(name) = self.rooms.get(room).map(|runtime| runtime.name.clone()) {
            presenter.show_center_prompt(
                &format!("{name} key collected."),
                DEFAULT_CENTER_PROMPT_SECONDS,
            );
        }
        self.mark_objective(room, "find-key", presenter);
        true
    }

    /// Makes the room's key collectible and visible. False if it already was, or is gone.
    pub(crate) fn activate_key(&mut self, room: usize) -> bool {
        let Some(key) = self.rooms.get(room).map(|runtime| runtime.key) else {
            return false;
        };
        let Some(entity) = self.registry.get_mut(key) else {
            return false;
        };
        let InteractableKind::Key(state) = &mut entity.kind else {
            return false;
        };
        if state.active || state.collected {
            return false;
        }
        state.active = true;
        entity.visible = true;
        info!(room, "key_activated");
        true
    }

    /// A possessed character takes the key; the door stays locked until the script opens it.
    pub(crate) fn pocket_key(&mut self, room: usize, presenter: &mut dyn Presenter) -> bool {
        let Some(key) = self.rooms.get(room).map(|runtime| runtime.key) else {
            return false;
        };
        let Some(entity) = self.registry.get_mut(key) else {
            return false;
        };
        let InteractableKind::Key(state) = &mut entity.kind else {
            return false;
        };
        if state.collected {
            return false;
        }
        state.active = false;
        state.collected = true;
        entity.visible = false;
        info!(room, "key_pocketed");
        self.mark_objective(room, "find-key", presenter);
        true
    }

    pub(crate) fn door_locked(&self, room: usize) -> Option<bool> {
        let door = self.rooms.get(room)?.door;
        match &self.registry.get(door)?.kind {
            InteractableKind::Door(state) => Some(state.locked),
            _ => None,
        }
    }

    /// Moves the player into `target`. Out-of-range targets change nothing.
    pub(crate) fn transition_to_room(
        &mut self,
        target: usize,
        title: TitlePolicy,
        presenter: &mut dyn Presenter,
    ) -> bool {
        if target >= self.rooms.len() {
            warn!(target, room_count = self.rooms.len(), "room_transition_rejected");
            return false;
        }
        let previous = self.active_room;
        if previous != target {
            let cancelled = self.timers.cancel_scope(room_scope(previous));
            if let Some(outcome) = self.run_room_action(previous, RoomAction::Exited, presenter) {
                show_outcome(&outcome, presenter);
            }
            debug!(room = previous, cancelled, "room_timers_cancelled");
        } else {
            // Re-entry replays the entry hooks, which schedule their timers afresh.
            let cancelled = self.timers.cancel_scope(room_scope(target));
            debug!(room = target, cancelled, "room_reentered");
        }

        self.overlay = None;
        self.hovered = None;
        self.active_room = target;
        let runtime = &mut self.rooms[target];
        let first_visit = !runtime.visited;
        runtime.visited = true;
        if runtime.reset_on_enter {
            runtime.seconds_in_room = 0.0;
        }
        let spawn = runtime.spawn_point();
        let reset_hints = runtime.reset_on_enter;
        let name = runtime.name.clone();
        self.player.teleport(spawn);
        self.player.face(0.0);
        if reset_hints {
            self.hints.reset_room(target);
        }
        info!(from = previous, to = target, first_visit, "room_transition");

        if first_visit || title == TitlePolicy::Always {
            presenter.show_room_title(&name);
        }
        self.objectives.show_room(target, presenter);
        if let Some(outcome) =
            self.run_room_action(target, RoomAction::Entered { first_visit }, presenter)
        {
            show_outcome(&outcome, presenter);
        }
        true
    }

    /// Debug checkpoint: opens every room before `target`, then starts there.
    pub(crate) fn skip_to_room(&mut self, target: usize, presenter: &mut dyn Presenter) -> bool {
        if target >= self.rooms.len() {
            warn!(target, room_count = self.rooms.len(), "room_skip_rejected");
            return false;
        }
        for room in 0..target {
            let (door, riddle) = (self.rooms[room].door, self.rooms[room].riddle);
            self.set_door_locked(door, false);
            self.activate_key(room);
            if let Some(InteractableKind::Riddle(state)) = riddle
                .and_then(|id| self.registry.get_mut(id))
                .map(|entity| &mut entity.kind)
            {
                state.solved = true;
            }
        }
        self.game_over = false;
        info!(target, "room_skip");
        self.transition_to_room(target, TitlePolicy::Always, presenter)
    }

    pub(crate) fn open_riddle(&mut self, id: InteractableId, presenter: &mut dyn Presenter) -> bool {
        let Some(InteractableKind::Riddle(state)) = self.registry.get(id).map(|entity| &entity.kind)
        else {
            return false;
        };
        if state.solved {
            return false;
        }
        presenter.show_popup(RIDDLE_TITLE, &state.question);
        self.overlay = Some(Overlay::Riddle(id));
        info!(room = state.room, "riddle_opened");
        true
    }

    pub(crate) fn close_riddle(&mut self, presenter: &mut dyn Presenter) -> bool {
        if !matches!(self.overlay, Some(Overlay::Riddle(_))) {
            return false;
        }
        self.overlay = None;
        presenter.close_popup();
        true
    }

    /// Checks an answer against the open riddle. Answers are trimmed and lowercased.
    pub(crate) fn submit_riddle_answer(&mut self, text: &str, presenter: &mut dyn Presenter) -> bool {
        let Some(Overlay::Riddle(id)) = self.overlay else {
            return false;
        };
        let guess = text.trim().to_lowercase();
        let Some(InteractableKind::Riddle(state)) =
            self.registry.get_mut(id).map(|entity| &mut entity.kind)
        else {
            return false;
        };
        let room = state.room;
        let correct = !guess.is_empty() && guess == state.answer;
        info!(room, correct, "riddle_attempt");
        if !correct {
            presenter.show_center_prompt(RIDDLE_WRONG_MESSAGE, 2.0);
            return false;
        }
        state.solved = true;
        self.close_riddle(presenter);
        self.mark_objective(room, "solve-riddle", presenter);

        let outcome = self.run_room_action(room, RoomAction::RiddleSolved, presenter);
        let riddle_gated = self
            .rooms
            .get(room)
            .is_some_and(|runtime| runtime.key_gate == KeyGate::Riddle);
        if riddle_gated && self.activate_key(room) {
            presenter.show_center_prompt(RIDDLE_KEY_MESSAGE, 3.0);
        }
        if let Some(outcome) = outcome {
            show_outcome(&outcome, presenter);
        }
        true
    }

    fn set_door_locked(&mut self, door: InteractableId, locked: bool) -> bool {
        match self.registry.get_mut(door).map(|entity| &mut entity.kind) {
            Some(InteractableKind::Door(state)) if state.locked && !locked => {
                state.locked = false;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use manor_engine::{builtin_mansion_blueprint, PresentationLog, Vec3};

    use super::*;

    fn world() -> MansionWorld {
        let blueprint = builtin_mansion_blueprint().expect("builtin blueprint");
        MansionWorld::from_blueprint(&blueprint).expect("world")
    }

    #[test]
    fn door_unlocks_exactly_once() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        assert_eq!(world.door_locked(1), Some(true));
        assert!(world.unlock_door(1, &mut presenter));
        assert!(!world.unlock_door(1, &mut presenter));
        assert_eq!(world.door_locked(1), Some(false));
        assert_eq!(presenter.cues(), vec!["door_unlock"]);
        assert_eq!(
            presenter.center_prompts(),
            vec!["Library of Whispers door unlocked."]
        );
    }

    #[test]
    fn inactive_key_is_not_collectible() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        let key = world.rooms[2].key;
        assert!(!world.collect_key(key, &mut presenter));
        assert_eq!(world.door_locked(2), Some(true));

        assert!(world.activate_key(2));
        assert!(!world.activate_key(2));
        assert!(world.collect_key(key, &mut presenter));
        assert!(!world.collect_key(key, &mut presenter));
        assert_eq!(world.door_locked(2), Some(false));
        assert_eq!(
            presenter.center_prompts(),
            vec!["Chairman's Office door unlocked.", "Chairman's Office key collected."]
        );
        assert!(world.objectives.is_done(2, "find-key"));
    }

    #[test]
    fn possession_gated_key_refuses_the_ghost() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        let key = world.rooms[0].key;
        world.activate_key(0);
        assert!(!world.collect_key(key, &mut presenter));
        assert_eq!(presenter.last_center_prompt(), Some(POSSESSION_KEY_MESSAGE));
        assert_eq!(world.door_locked(0), Some(true));

        assert!(world.pocket_key(0, &mut presenter));
        assert!(!world.pocket_key(0, &mut presenter));
        assert_eq!(world.door_locked(0), Some(true));
    }

    #[test]
    fn out_of_range_transition_changes_nothing() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        let before = world.player.position();
        assert!(!world.transition_to_room(99, TitlePolicy::FirstVisit, &mut presenter));
        assert_eq!(world.active_room, 0);
        assert_eq!(world.player.position(), before);
        assert!(presenter.events().is_empty());
        assert!(!world.skip_to_room(4, &mut presenter));
    }

    #[test]
    fn transition_places_player_and_titles_first_visit_only() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        assert!(world.transition_to_room(0, TitlePolicy::FirstVisit, &mut presenter));
        assert!(world.transition_to_room(2, TitlePolicy::FirstVisit, &mut presenter));
        assert_eq!(world.active_room, 2);
        assert_eq!(world.player.position(), Vec3::new(0.0, 0.0, -26.0));
        world.transition_to_room(0, TitlePolicy::FirstVisit, &mut presenter);
        world.transition_to_room(2, TitlePolicy::FirstVisit, &mut presenter);
        let titles = presenter
            .events()
            .iter()
            .filter(|event| matches!(event, manor_engine::PresentationEvent::RoomTitle { .. }))
            .count();
        assert_eq!(titles, 2);
    }

    #[test]
    fn leaving_a_room_cancels_its_timers() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        world.skip_to_room(3, &mut presenter);
        assert_eq!(world.timers.pending_in_scope(room_scope(3)), 2);
        world.transition_to_room(2, TitlePolicy::FirstVisit, &mut presenter);
        assert_eq!(world.timers.pending_in_scope(room_scope(3)), 0);
    }

    #[test]
    fn reentering_the_active_room_does_not_double_its_timers() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        world.skip_to_room(3, &mut presenter);
        assert!(world.transition_to_room(3, TitlePolicy::FirstVisit, &mut presenter));
        assert_eq!(world.active_room, 3);
        assert_eq!(world.timers.pending_in_scope(room_scope(3)), 2);
    }

    #[test]
    fn skip_opens_every_earlier_room() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        assert!(world.skip_to_room(2, &mut presenter));
        assert_eq!(world.door_locked(0), Some(false));
        assert_eq!(world.door_locked(1), Some(false));
        assert_eq!(world.door_locked(2), Some(true));
        assert_eq!(world.active_room, 2);
    }

    #[test]
    fn riddle_answer_is_normalized_and_activates_riddle_gated_key() {
        let mut world = world();
        let mut presenter = PresentationLog::new();
        let riddle = world.rooms[1].riddle.expect("labs riddle");
        assert!(!world.submit_riddle_answer("middle", &mut presenter));

        assert!(world.open_riddle(riddle, &mut presenter));
        assert!(presenter.is_popup_open());
        assert!(!world.submit_riddle_answer("lantern", &mut presenter));
        assert_eq!(presenter.last_center_prompt(), Some(RIDDLE_WRONG_MESSAGE));
        assert!(world.submit_riddle_answer("  MIDDLE ", &mut presenter));
        assert!(!presenter.is_popup_open());
        assert_eq!(world.overlay, None);

        let key = world.registry.get(world.rooms[1].key).expect("key");
        assert!(matches!(&key.kind, InteractableKind::Key(state) if state.active));
        assert!(world.rooms[1].heart.is_some());
        assert!(!world.open_riddle(riddle, &mut presenter));
    }
}
