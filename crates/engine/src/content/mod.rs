mod blueprint;
mod compiler;

pub use blueprint::{
    AnchorOverride, KeyBlueprint, KeyGate, LetterBlueprint, MansionBlueprint, ObjectBlueprint,
    ObjectiveBlueprint, RiddleBlueprint, RoomBlueprint,
};
pub use compiler::{
    builtin_mansion_blueprint, compile_mansion_blueprint, load_mansion_blueprint,
    ContentCompileError, ContentErrorCode, SourceLocation, BUILTIN_MANSION_PATH,
    BUILTIN_MANSION_XML,
};
