use serde::Serialize;
use tracing::info;

pub const DEFAULT_CENTER_PROMPT_SECONDS: f32 = 2.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 0.7,
            volume: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistEntry {
    pub id: String,
    pub label: String,
    pub done: bool,
}

/// Output side of the game. Every call is fire-and-forget; the core never reads back
/// presentation state.
pub trait Presenter {
    fn show_center_prompt(&mut self, text: &str, duration_seconds: f32);
    fn set_interaction_prompt(&mut self, text: Option<&str>);
    fn speak(&mut self, _text: &str, _voice: VoiceSettings) {}
    fn play_cue(&mut self, _cue: &str) {}
    fn show_popup(&mut self, title: &str, body: &str);
    fn close_popup(&mut self);
    fn show_room_title(&mut self, title: &str);
    fn show_checklist(&mut self, room_name: &str, entries: &[ChecklistEntry]);
    fn show_end_screen(&mut self, text: &str);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresentationEvent {
    CenterPrompt {
        text: String,
        duration_seconds: f32,
    },
    InteractionPrompt {
        text: Option<String>,
    },
    Speech {
        text: String,
        voice: VoiceSettings,
    },
    Cue {
        name: String,
    },
    PopupOpened {
        title: String,
        body: String,
    },
    PopupClosed,
    RoomTitle {
        title: String,
    },
    Checklist {
        room_name: String,
        entries: Vec<ChecklistEntry>,
    },
    EndScreen {
        text: String,
    },
}

/// Presenter that records every call, for the headless runner and for tests.
#[derive(Debug, Default)]
pub struct PresentationLog {
    events: Vec<PresentationEvent>,
    interaction_prompt: Option<String>,
    popup_open: bool,
    echo_to_log: bool,
    speech_available: bool,
    audio_available: bool,
}

impl PresentationLog {
    pub fn new() -> Self {
        Self {
            speech_available: true,
            audio_available: true,
            ..Self::default()
        }
    }

    pub fn with_echo_to_log(mut self, echo_to_log: bool) -> Self {
        self.echo_to_log = echo_to_log;
        self
    }

    /// Missing collaborators degrade silently: calls are dropped, nothing else changes.
    pub fn with_speech_available(mut self, speech_available: bool) -> Self {
        self.speech_available = speech_available;
        self
    }

    pub fn with_audio_available(mut self, audio_available: bool) -> Self {
        self.audio_available = audio_available;
        self
    }

    pub fn events(&self) -> &[PresentationEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PresentationEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn interaction_prompt(&self) -> Option<&str> {
        self.interaction_prompt.as_deref()
    }

    pub fn is_popup_open(&self) -> bool {
        self.popup_open
    }

    pub fn center_prompts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresentationEvent::CenterPrompt { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn last_center_prompt(&self) -> Option<&str> {
        self.center_prompts().last().copied()
    }

    pub fn cues(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresentationEvent::Cue { name } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn spoken_lines(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresentationEvent::Speech { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, event: PresentationEvent) {
        if self.echo_to_log {
            echo_event(&event);
        }
        self.events.push(event);
    }
}

impl Presenter for PresentationLog {
    fn show_center_prompt(&mut self, text: &str, duration_seconds: f32) {
        self.record(PresentationEvent::CenterPrompt {
            text: text.to_string(),
            duration_seconds,
        });
    }

    fn set_interaction_prompt(&mut self, text: Option<&str>) {
        if self.interaction_prompt.as_deref() == text {
            return;
        }
        self.interaction_prompt = text.map(ToString::to_string);
        self.record(PresentationEvent::InteractionPrompt {
            text: self.interaction_prompt.clone(),
        });
    }

    fn speak(&mut self, text: &str, voice: VoiceSettings) {
        if !self.speech_available {
            return;
        }
        self.record(PresentationEvent::Speech {
            text: text.to_string(),
            voice,
        });
    }

    fn play_cue(&mut self, cue: &str) {
        if !self.audio_available {
            return;
        }
        self.record(PresentationEvent::Cue {
            name: cue.to_string(),
        });
    }

    fn show_popup(&mut self, title: &str, body: &str) {
        self.popup_open = true;
        self.record(PresentationEvent::PopupOpened {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn close_popup(&mut self) {
        self.popup_open = false;
        self.record(PresentationEvent::PopupClosed);
    }

    fn show_room_title(&mut self, title: &str) {
        self.record(PresentationEvent::RoomTitle {
            title: title.to_string(),
        });
    }

    fn show_checklist(&mut self, room_name: &str, entries: &[ChecklistEntry]) {
        self.record(PresentationEvent::Checklist {
            room_name: room_name.to_string(),
            entries: entries.to_vec(),
        });
    }

    fn show_end_screen(&mut self, text: &str) {
        self.record(PresentationEvent::EndScreen {
            text: text.to_string(),
        });
    }
}

fn echo_event(event: &PresentationEvent) {
    match event {
        PresentationEvent::CenterPrompt {
            text,
            duration_seconds,
        } => info!(text = %text, duration_seconds, "center_prompt"),
        PresentationEvent::InteractionPrompt { text } => {
            info!(text = text.as_deref().unwrap_or(""), "interaction_prompt")
        }
        PresentationEvent::Speech { text, .. } => info!(text = %text, "speech"),
        PresentationEvent::Cue { name } => info!(cue = %name, "sound_cue"),
        PresentationEvent::PopupOpened { title, .. } => info!(title = %title, "popup_opened"),
        PresentationEvent::PopupClosed => info!("popup_closed"),
        PresentationEvent::RoomTitle { title } => info!(title = %title, "room_title"),
        PresentationEvent::Checklist { room_name, entries } => {
            let done = entries.iter().filter(|entry| entry.done).count();
            info!(room = %room_name, done, total = entries.len(), "checklist")
        }
        PresentationEvent::EndScreen { text } => info!(text = %text, "end_screen"),
    }
}
