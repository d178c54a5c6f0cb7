use manor_engine::{ChecklistEntry, MansionBlueprint, Presenter};
use tracing::info;

#[derive(Debug, Clone)]
struct RoomChecklist {
    room_name: String,
    entries: Vec<ChecklistEntry>,
}

/// Per-room checklist. Marks are idempotent; only the active room's list is on screen.
#[derive(Debug, Clone)]
pub(crate) struct ObjectiveTracker {
    rooms: Vec<RoomChecklist>,
}

impl ObjectiveTracker {
    pub(crate) fn from_blueprint(blueprint: &MansionBlueprint) -> Self {
        let rooms = blueprint
            .rooms
            .iter()
            .map(|room| RoomChecklist {
                room_name: room.name.clone(),
                entries: room
                    .objectives
                    .iter()
                    .map(|objective| ChecklistEntry {
                        id: objective.id.clone(),
                        label: objective.label.clone(),
                        done: false,
                    })
                    .collect(),
            })
            .collect();
        Self { rooms }
    }

    pub(crate) fn show_room(&self, room: usize, presenter: &mut dyn Presenter) {
        if let Some(checklist) = self.rooms.get(room) {
            presenter.show_checklist(&checklist.room_name, &checklist.entries);
        }
    }

    /// Returns true when the objective flips to done. Unknown ids are ignored.
    pub(crate) fn mark(
        &mut self,
        room: usize,
        id: &str,
        on_screen: bool,
        presenter: &mut dyn Presenter,
    ) -> bool {
        let Some(checklist) = self.rooms.get_mut(room) else {
            return false;
        };
        let Some(entry) = checklist.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        if entry.done {
            return false;
        }
        entry.done = true;
        info!(room, objective = id, "objective_completed");
        if on_screen {
            presenter.show_checklist(&checklist.room_name, &checklist.entries);
        }
        true
    }

    pub(crate) fn is_done(&self, room: usize, id: &str) -> bool {
        self.rooms
            .get(room)
            .and_then(|checklist| checklist.entries.iter().find(|entry| entry.id == id))
            .is_some_and(|entry| entry.done)
    }

    pub(crate) fn entries(&self, room: usize) -> &[ChecklistEntry] {
        self.rooms
            .get(room)
            .map(|checklist| checklist.entries.as_slice())
            .unwrap_or_default()
    }
}
