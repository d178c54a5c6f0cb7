mod input;
mod interaction;
mod loop_runner;
mod math;
mod presentation;
mod scene;
mod timers;
mod tools;

pub use input::InputAction;
pub use interaction::{
    Interactable, InteractableDesc, InteractableId, InteractableIdAllocator,
    InteractableRegistry, InteractionEligibility, DEFAULT_INTERACTION_RANGE,
};
pub use loop_runner::{AppError, HeadlessLoop, LoopConfig, RunSummary};
pub use math::{HorizontalBounds, Vec3};
pub use presentation::{
    ChecklistEntry, PresentationEvent, PresentationLog, Presenter, VoiceSettings,
    DEFAULT_CENTER_PROMPT_SECONDS,
};
pub use scene::{InputSnapshot, Scene, SceneCommand, SceneDebugCommand, SceneDebugCommandResult};
pub use timers::{TimerHandle, TimerQueue, TimerScope};
