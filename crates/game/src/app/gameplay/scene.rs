use manor_engine::{
    ChecklistEntry, InputSnapshot, InteractableId, Presenter, Scene, SceneCommand,
    SceneDebugCommand, SceneDebugCommandResult, Vec3,
};
use serde::Serialize;
use tracing::{info, warn};

use super::hints::ShownHints;
use super::progression::TitlePolicy;
use super::rooms::RoomAction;
use super::types::{prompt_for, InteractableKind, NOT_AVAILABLE_MESSAGE};
use super::world::{show_outcome, MansionWorld, Overlay};

const FLASHLIGHT_ON_MESSAGE: &str = "Flashlight engaged.";
const FLASHLIGHT_OFF_MESSAGE: &str = "Flashlight dark.";
const DOOR_SEALED_MESSAGE: &str = "The door is sealed tight.";
const VICTORY_TEXT: &str = "You escaped the mansion.";
const UPDATE_ORDER_TEXT: &str = "Movement>Flashlight>Target>Interact>RoomHooks>Timers>RewardBob";

/// The mansion as a `Scene`: owns the world and runs the per-tick update order.
pub(crate) struct MansionScene {
    world: MansionWorld,
    start_room: usize,
}

impl MansionScene {
    pub(crate) fn new(world: MansionWorld, start_room: usize) -> Self {
        Self { world, start_room }
    }

    #[cfg(test)]
    pub(crate) fn world(&self) -> &MansionWorld {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut MansionWorld {
        &mut self.world
    }

    fn refresh_target(&mut self, presenter: &mut dyn Presenter) {
        let world = &mut self.world;
        world.hovered = if world.game_over || world.overlay.is_some() {
            None
        } else {
            world.registry.query_nearest(world.player.position())
        };
        let prompt = world
            .hovered
            .and_then(|id| world.registry.get(id))
            .and_then(prompt_for);
        presenter.set_interaction_prompt(prompt.as_deref());
    }

    fn press_interact(&mut self, presenter: &mut dyn Presenter) {
        match self.world.overlay {
            Some(Overlay::Letter(id)) => self.world.close_letter(id, presenter),
            Some(Overlay::Scripted { room, prop }) => self.close_scripted_popup(room, prop, presenter),
            // The riddle overlay only takes answers or an explicit close.
            Some(Overlay::Riddle(_)) => {}
            None => {
                if let Some(id) = self.world.hovered {
                    self.handle_interaction(id, presenter);
                }
            }
        }
    }

    fn close_scripted_popup(
        &mut self,
        room: usize,
        prop: super::types::PropKind,
        presenter: &mut dyn Presenter,
    ) {
        presenter.close_popup();
        self.world.overlay = None;
        if let Some(outcome) =
            self.world
                .run_room_action(room, RoomAction::PopupClosed(prop), presenter)
        {
            show_outcome(&outcome, presenter);
        }
    }

    /// Dispatches the activate signal to the targeted entity by kind.
    fn handle_interaction(&mut self, id: InteractableId, presenter: &mut dyn Presenter) {
        let Some(entity) = self.world.registry.get(id) else {
            return;
        };
        let enabled = entity.enabled;
        let fallback_prompt = entity
            .prompt
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE_MESSAGE.to_string());
        let kind = entity.kind.clone();
        info!(interactable = id.0, kind = kind.label(), "interaction");

        match kind {
            InteractableKind::Key(_) => {
                self.world.collect_key(id, presenter);
            }
            InteractableKind::Door(door) => {
                if door.locked {
                    presenter.show_center_prompt(DOOR_SEALED_MESSAGE, 2.6);
                } else if let Some(next) = door.next_room {
                    self.world
                        .transition_to_room(next, TitlePolicy::FirstVisit, presenter);
                } else {
                    self.trigger_victory(presenter);
                }
            }
            InteractableKind::Riddle(_) => {
                self.world.open_riddle(id, presenter);
            }
            InteractableKind::Possessable { room, target } => {
                let outcome = if enabled {
                    self.world
                        .run_room_action(room, RoomAction::Possess(target), presenter)
                } else {
                    None
                };
                match outcome {
                    Some(outcome) => show_outcome(&outcome, presenter),
                    None => presenter.show_center_prompt(&fallback_prompt, 2.0),
                }
            }
            InteractableKind::Prop { room, prop } => {
                let outcome = if enabled {
                    self.world
                        .run_room_action(room, RoomAction::Interact(prop), presenter)
                } else {
                    None
                };
                match outcome {
                    Some(outcome) => show_outcome(&outcome, presenter),
                    None => presenter.show_center_prompt(&fallback_prompt, 2.0),
                }
            }
            InteractableKind::HeartFragment(_) => {
                self.world.collect_heart(id, presenter);
            }
            InteractableKind::Letter(_) => {
                self.world.open_letter(id, presenter);
            }
        }
    }

    fn trigger_victory(&mut self, presenter: &mut dyn Presenter) {
        if self.world.game_over {
            return;
        }
        self.world.game_over = true;
        self.world.hovered = None;
        self.world.player.set_flashlight(false);
        presenter.set_interaction_prompt(None);
        presenter.show_end_screen(VICTORY_TEXT);
        info!(room = self.world.active_room, "victory");
    }

    fn close_any_popup(&mut self, presenter: &mut dyn Presenter) -> Option<&'static str> {
        match self.world.overlay? {
            Overlay::Riddle(_) => {
                self.world.close_riddle(presenter);
                Some("riddle")
            }
            Overlay::Letter(id) => {
                self.world.close_letter(id, presenter);
                Some("letter")
            }
            Overlay::Scripted { room, prop } => {
                self.close_scripted_popup(room, prop, presenter);
                Some("popup")
            }
        }
    }

    fn snapshot(&self) -> StateSnapshot<'_> {
        let world = &self.world;
        let room = world.active();
        let interactables = world
            .registry
            .iter()
            .filter(|entity| entity.kind.room() == world.active_room)
            .map(|entity| InteractableSnapshot {
                id: entity.id.0,
                kind: &entity.kind,
                position: entity.position,
                enabled: entity.enabled,
                visible: entity.visible,
                prompt: prompt_for(entity),
            })
            .collect();
        StateSnapshot {
            active_room: world.active_room,
            room_name: room.map(|room| room.name.as_str()).unwrap_or_default(),
            stage: room.map(|room| room.script.stage()).unwrap_or_default(),
            next_room: room.and_then(|room| room.next_room),
            seconds_in_room: room.map(|room| room.seconds_in_room).unwrap_or_default(),
            player: world.player.position(),
            yaw_radians: world.player.yaw_radians(),
            flashlight_on: world.player.flashlight_on(),
            game_over: world.game_over,
            overlay: world.overlay.map(|overlay| match overlay {
                Overlay::Riddle(_) => "riddle",
                Overlay::Letter(_) => "letter",
                Overlay::Scripted { .. } => "popup",
            }),
            hovered: world.hovered.map(|id| id.0),
            door_locked: world.door_locked(world.active_room).unwrap_or(true),
            hints_shown: world.hints.shown(world.active_room),
            objectives: world.objectives.entries(world.active_room),
            pending_timers: world.timers.pending_count(),
            interactables,
        }
    }
}

#[derive(Debug, Serialize)]
struct InteractableSnapshot<'a> {
    id: u64,
    #[serde(flatten)]
    kind: &'a InteractableKind,
    position: Vec3,
    enabled: bool,
    visible: bool,
    prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct StateSnapshot<'a> {
    active_room: usize,
    room_name: &'a str,
    stage: String,
    next_room: Option<usize>,
    seconds_in_room: f32,
    player: Vec3,
    yaw_radians: f32,
    flashlight_on: bool,
    game_over: bool,
    overlay: Option<&'static str>,
    hovered: Option<u64>,
    door_locked: bool,
    hints_shown: &'a ShownHints,
    objectives: &'a [ChecklistEntry],
    pending_timers: usize,
    interactables: Vec<InteractableSnapshot<'a>>,
}

impl Scene for MansionScene {
    fn load(&mut self, presenter: &mut dyn Presenter) {
        let started = if self.start_room == 0 {
            self.world
                .transition_to_room(0, TitlePolicy::FirstVisit, presenter)
        } else {
            self.world.skip_to_room(self.start_room, presenter)
        };
        if !started {
            warn!(start_room = self.start_room, "start_room_rejected");
            self.world
                .transition_to_room(0, TitlePolicy::FirstVisit, presenter);
        }
        self.refresh_target(presenter);
        info!(
            start_room = self.world.active_room,
            rooms = self.world.room_count(),
            interactables = self.world.registry.len(),
            order = UPDATE_ORDER_TEXT,
            "mansion_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        presenter: &mut dyn Presenter,
    ) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        if self.world.game_over {
            return SceneCommand::None;
        }

        if self.world.overlay.is_none() {
            if let Some(bounds) = self.world.active().map(|room| room.bounds) {
                self.world.player.update(fixed_dt_seconds, input, &bounds);
            }
        }

        if input.flashlight_toggle_pressed() {
            let message = if self.world.player.toggle_flashlight() {
                FLASHLIGHT_ON_MESSAGE
            } else {
                FLASHLIGHT_OFF_MESSAGE
            };
            presenter.show_center_prompt(message, 1.5);
        }

        self.refresh_target(presenter);
        if input.interact_pressed() {
            self.press_interact(presenter);
        }

        if !self.world.game_over {
            let room = self.world.active_room;
            self.world.tick_room(room, fixed_dt_seconds, presenter);
            self.world.fire_due_timers(fixed_dt_seconds, presenter);
        }
        self.world.advance_bobs(fixed_dt_seconds);

        if input.interact_pressed() {
            self.refresh_target(presenter);
        }
        SceneCommand::None
    }

    fn unload(&mut self, presenter: &mut dyn Presenter) {
        presenter.set_interaction_prompt(None);
        let cancelled = self
            .world
            .timers
            .cancel_scope(super::world::room_scope(self.world.active_room));
        info!(
            room = self.world.active_room,
            cancelled_timers = cancelled,
            "mansion_unloaded"
        );
    }

    fn debug_title(&self) -> Option<String> {
        let room = self.world.active()?;
        let position = self.world.player.position();
        Some(format!(
            "{} | {} | ({:.1}, {:.1})",
            room.name,
            room.script.stage(),
            position.x,
            position.z
        ))
    }

    fn debug_player_position(&self) -> Option<Vec3> {
        Some(self.world.player.position())
    }

    fn execute_debug_command(
        &mut self,
        command: SceneDebugCommand,
        presenter: &mut dyn Presenter,
    ) -> SceneDebugCommandResult {
        let room_count = self.world.room_count();
        let result = match command {
            SceneDebugCommand::SkipToRoom { room_index } => {
                if self.world.skip_to_room(room_index, presenter) {
                    SceneDebugCommandResult::Success(format!(
                        "skipped to room {room_index} ({})",
                        self.world.rooms[room_index].name
                    ))
                } else {
                    SceneDebugCommandResult::Error(format!(
                        "room index {room_index} out of range 0..{room_count}"
                    ))
                }
            }
            SceneDebugCommand::GotoRoom { room_index } => {
                if self
                    .world
                    .transition_to_room(room_index, TitlePolicy::FirstVisit, presenter)
                {
                    SceneDebugCommandResult::Success(format!("entered room {room_index}"))
                } else {
                    SceneDebugCommandResult::Error(format!(
                        "room index {room_index} out of range 0..{room_count}"
                    ))
                }
            }
            SceneDebugCommand::Teleport { x, y, z } => {
                self.world.player.teleport(Vec3::new(x, y, z));
                SceneDebugCommandResult::Success(format!("teleported to ({x:.2}, {y:.2}, {z:.2})"))
            }
            SceneDebugCommand::Face { yaw_degrees } => {
                self.world.player.face(yaw_degrees.to_radians());
                SceneDebugCommandResult::Success(format!("facing {yaw_degrees:.1} degrees"))
            }
            SceneDebugCommand::Answer { text } => {
                if !matches!(self.world.overlay, Some(Overlay::Riddle(_))) {
                    SceneDebugCommandResult::Error("no riddle is open".to_string())
                } else if self.world.submit_riddle_answer(&text, presenter) {
                    SceneDebugCommandResult::Success("riddle solved".to_string())
                } else {
                    SceneDebugCommandResult::Success("answer rejected".to_string())
                }
            }
            SceneDebugCommand::ClosePopup => match self.close_any_popup(presenter) {
                Some(what) => SceneDebugCommandResult::Success(format!("closed {what}")),
                None => SceneDebugCommandResult::Error("no popup is open".to_string()),
            },
            SceneDebugCommand::DumpState => match serde_json::to_string(&self.snapshot()) {
                Ok(json) => SceneDebugCommandResult::Success(json),
                Err(error) => SceneDebugCommandResult::Error(format!("state dump failed: {error}")),
            },
        };
        self.refresh_target(presenter);
        result
    }
}
