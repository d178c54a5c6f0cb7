//! Narrative hint dispatcher.
//!
//! Keyed hints fire at most once per room session; unkeyed hints and narration always
//! show. Every displayed hint replaces the current center prompt and is spoken.

use std::collections::BTreeSet;

use manor_engine::{Presenter, VoiceSettings};
use serde::Serialize;
use tracing::debug;

/// Hint keys a room has already shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub(crate) struct ShownHints {
    keys: BTreeSet<String>,
}

static NO_HINTS: ShownHints = ShownHints {
    keys: BTreeSet::new(),
};

impl ShownHints {
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Records `key` and reports whether the hint may show. Unkeyed hints always may.
    pub(crate) fn admit(&mut self, key: Option<&str>) -> bool {
        match key {
            Some(key) => self.keys.insert(key.to_string()),
            None => true,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

#[derive(Debug)]
pub(crate) struct HintDispatcher {
    rooms: Vec<ShownHints>,
    voice: VoiceSettings,
}

impl HintDispatcher {
    pub(crate) fn new(room_count: usize) -> Self {
        Self {
            rooms: vec![ShownHints::default(); room_count],
            voice: VoiceSettings::default(),
        }
    }

    pub(crate) fn shown(&self, room: usize) -> &ShownHints {
        self.rooms.get(room).unwrap_or(&NO_HINTS)
    }

    pub(crate) fn show_hint(
        &mut self,
        room: usize,
        text: &str,
        duration_seconds: f32,
        key: Option<&str>,
        presenter: &mut dyn Presenter,
    ) -> bool {
        let Some(shown) = self.rooms.get_mut(room) else {
            return false;
        };
        if !shown.admit(key) {
            debug!(room, key = key.unwrap_or_default(), "hint_deduplicated");
            return false;
        }
        debug!(room, key = key.unwrap_or_default(), "hint_shown");
        presenter.show_center_prompt(text, duration_seconds);
        presenter.speak(text, self.voice);
        true
    }

    /// Spoken center prompt that bypasses deduplication.
    pub(crate) fn narrate(&self, text: &str, duration_seconds: f32, presenter: &mut dyn Presenter) {
        presenter.show_center_prompt(text, duration_seconds);
        presenter.speak(text, self.voice);
    }

    pub(crate) fn speak(&self, text: &str, presenter: &mut dyn Presenter) {
        presenter.speak(text, self.voice);
    }

    /// Forgets which hints a room has shown, for rooms that restart their guidance on entry.
    pub(crate) fn reset_room(&mut self, room: usize) {
        if let Some(shown) = self.rooms.get_mut(room) {
            debug!(room, cleared = shown.len(), "hints_reset");
            *shown = ShownHints::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use manor_engine::PresentationLog;

    use super::*;

    fn log() -> PresentationLog {
        PresentationLog::new()
            .with_speech_available(true)
            .with_audio_available(true)
    }

    #[test]
    fn keyed_hint_shows_once() {
        let mut hints = HintDispatcher::new(2);
        let mut presenter = log();
        assert!(hints.show_hint(0, "Look up.", 5.0, Some("X"), &mut presenter));
        assert!(hints.shown(0).contains("X"));
        assert!(!hints.show_hint(0, "Look up.", 5.0, Some("X"), &mut presenter));
        assert_eq!(presenter.center_prompts(), vec!["Look up."]);
        assert_eq!(presenter.spoken_lines(), vec!["Look up."]);
    }

    #[test]
    fn shown_sets_are_per_room_and_unkeyed_hints_repeat() {
        let mut hints = HintDispatcher::new(2);
        let mut presenter = log();
        hints.show_hint(0, "a", 1.0, Some("X"), &mut presenter);
        assert!(hints.show_hint(1, "a", 1.0, Some("X"), &mut presenter));
        assert!(hints.show_hint(1, "b", 1.0, None, &mut presenter));
        assert!(hints.show_hint(1, "b", 1.0, None, &mut presenter));
        assert_eq!(presenter.center_prompts().len(), 4);
    }

    #[test]
    fn reset_room_allows_keyed_hints_again() {
        let mut hints = HintDispatcher::new(1);
        let mut presenter = log();
        hints.show_hint(0, "a", 1.0, Some("X"), &mut presenter);
        hints.reset_room(0);
        assert!(!hints.shown(0).contains("X"));
        assert!(hints.show_hint(0, "a", 1.0, Some("X"), &mut presenter));
    }

    #[test]
    fn unknown_room_is_ignored() {
        let mut hints = HintDispatcher::new(1);
        let mut presenter = log();
        assert!(!hints.show_hint(7, "a", 1.0, None, &mut presenter));
        assert_eq!(hints.shown(7).len(), 0);
        assert!(presenter.events().is_empty());
    }
}
