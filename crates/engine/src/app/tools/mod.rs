mod console;
pub(crate) mod console_commands;

pub(crate) use console::ConsoleState;
pub(crate) use console_commands::{ConsoleCommandProcessor, DebugCommand, PressAction};
