use std::collections::{HashMap, VecDeque};

use crate::app::{InputAction, SceneDebugCommand};

use super::ConsoleState;

const MAX_PENDING_DEBUG_COMMANDS: usize = 128;
const MAX_TICKS_PER_COMMAND: u32 = 60 * 60 * 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PressAction {
    Interact,
    Flashlight,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DebugCommand {
    Quit,
    Tick { ticks: u32 },
    Wait { seconds: f32 },
    Hold { action: InputAction, is_down: bool },
    PointerLock { locked: bool },
    Press { action: PressAction },
    Scene(SceneDebugCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LocalAction {
    Help,
    Clear,
    Echo { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedCommand {
    Local(LocalAction),
    Queueable(DebugCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    fn new(reason: impl Into<String>, usage: &str) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.to_string(),
        }
    }
}

type ParseFn = dyn Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync;
type BuiltinParseFn = fn(&[String]) -> Result<ParsedCommand, CommandParseError>;

pub(crate) struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

pub(crate) struct ConsoleCommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl ConsoleCommandRegistry {
    pub(crate) fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, &str, &str, BuiltinParseFn); 19] = [
            ("help", "List commands", "", parse_help_command),
            ("clear", "Clear console output", "", parse_clear_command),
            ("echo", "Print text to console", "<text...>", parse_echo_command),
            ("quit", "Quit app", "", parse_quit_command),
            ("tick", "Advance fixed ticks", "[count:u32]", parse_tick_command),
            ("wait", "Advance simulated seconds", "<seconds:f32>", parse_wait_command),
            ("hold", "Hold a movement key", "<forward|backward|left|right>", parse_hold_command),
            ("release", "Release a movement key", "<forward|backward|left|right>", parse_release_command),
            ("pointer", "Lock or release the pointer", "<on|off>", parse_pointer_command),
            ("interact", "Press the interact key for one tick", "", parse_interact_command),
            ("flashlight", "Toggle the flashlight", "", parse_flashlight_command),
            ("skip_to_room", "Unlock every earlier room and start there", "<room:usize>", parse_skip_to_room_command),
            ("goto_room", "Transition to a room without unlocking", "<room:usize>", parse_goto_room_command),
            ("teleport", "Move the player", "<x:f32> <y:f32> <z:f32>", parse_teleport_command),
            ("face", "Set player yaw", "<degrees:f32>", parse_face_command),
            ("answer", "Submit an answer to the open riddle", "<text...>", parse_answer_command),
            ("close", "Close the open popup or riddle", "", parse_close_command),
            ("dump_state", "Print progression state", "", parse_dump_state_command),
            ("status", "Alias of dump_state", "", parse_dump_state_command),
        ];
        for (name, help, arg_schema, parse) in builtins {
            registry
                .register(name, help, arg_schema, parse)
                .expect("built-in command registration should not fail");
        }
        registry
    }

    pub(crate) fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name
            .insert(lower, self.specs.len() - 1);
        Ok(())
    }

    pub(crate) fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    pub(crate) fn iter_specs_in_order(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        // Help output order is registration order.
        self.specs.iter().map(|spec| {
            (
                spec.name.as_str(),
                spec.help.as_str(),
                spec.arg_schema.as_str(),
            )
        })
    }
}

pub(crate) struct ConsoleCommandProcessor {
    registry: ConsoleCommandRegistry,
    pending_debug_commands: VecDeque<DebugCommand>,
}

impl Default for ConsoleCommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleCommandProcessor {
    pub(crate) fn new() -> Self {
        Self {
            registry: ConsoleCommandRegistry::with_builtins(),
            pending_debug_commands: VecDeque::new(),
        }
    }

    pub(crate) fn process_pending_lines(&mut self, console: &mut ConsoleState) {
        let mut lines = Vec::new();
        console.drain_pending_lines_into(&mut lines);

        for raw_line in lines {
            self.process_line(console, &raw_line);
        }
    }

    pub(crate) fn drain_pending_debug_commands_into(&mut self, out: &mut Vec<DebugCommand>) {
        out.extend(self.pending_debug_commands.drain(..));
    }

    fn process_line(&mut self, console: &mut ConsoleState, raw_line: &str) {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }

        let tokens = match tokenize_line(trimmed) {
            Ok(tokens) => tokens,
            Err(reason) => {
                console.append_output_line(format!("error: {reason}. usage: help"));
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }

        let command_name = &tokens[0];
        let args = &tokens[1..];
        let Some(spec) = self.registry.lookup(command_name) else {
            console.append_output_line(format!(
                "error: unknown command '{}'. try: help",
                command_name
            ));
            return;
        };

        match (spec.parse)(args) {
            Ok(ParsedCommand::Local(action)) => self.apply_local_action(console, action),
            Ok(ParsedCommand::Queueable(command)) => self.push_queueable(command),
            Err(error) => {
                console
                    .append_output_line(format!("error: {}. usage: {}", error.reason, error.usage));
            }
        }
    }

    fn apply_local_action(&self, console: &mut ConsoleState, action: LocalAction) {
        match action {
            LocalAction::Help => {
                for (name, help, arg_schema) in self.registry.iter_specs_in_order() {
                    let line = if arg_schema.is_empty() {
                        format!("{name} - {help}")
                    } else {
                        format!("{name} {arg_schema} - {help}")
                    };
                    console.append_output_line(line);
                }
            }
            LocalAction::Clear => {
                console.clear_output_lines();
            }
            LocalAction::Echo { text } => {
                console.append_output_line(text);
            }
        }
    }

    fn push_queueable(&mut self, command: DebugCommand) {
        if self.pending_debug_commands.len() == MAX_PENDING_DEBUG_COMMANDS {
            self.pending_debug_commands.pop_front();
        }
        self.pending_debug_commands.push_back(command);
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;
    let mut just_closed_quote = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
                if !in_quotes {
                    just_closed_quote = true;
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content || just_closed_quote || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                    just_closed_quote = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
                just_closed_quote = false;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }

    if seen_token_content || just_closed_quote || !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

fn parse_help_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_clear_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "clear")?;
    Ok(ParsedCommand::Local(LocalAction::Clear))
}

fn parse_echo_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError::new(
            "missing required argument <text...>",
            "echo <text...>",
        ));
    }
    Ok(ParsedCommand::Local(LocalAction::Echo {
        text: args.join(" "),
    }))
}

fn parse_quit_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Quit))
}

fn parse_tick_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "tick [count]";
    let ticks = match args {
        [] => 1,
        [count] => count.parse::<u32>().map_err(|_| {
            CommandParseError::new(format!("invalid tick count '{count}' (expected u32)"), USAGE)
        })?,
        _ => return Err(CommandParseError::new("expected at most one argument [count]", USAGE)),
    };
    if ticks == 0 || ticks > MAX_TICKS_PER_COMMAND {
        return Err(CommandParseError::new(
            format!("tick count must be in 1..={MAX_TICKS_PER_COMMAND}"),
            USAGE,
        ));
    }
    Ok(ParsedCommand::Queueable(DebugCommand::Tick { ticks }))
}

fn parse_wait_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "wait <seconds>";
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one argument <seconds>", USAGE));
    };
    let seconds = parse_f32(raw, "seconds", USAGE)?;
    if seconds <= 0.0 {
        return Err(CommandParseError::new("seconds must be > 0", USAGE));
    }
    Ok(ParsedCommand::Queueable(DebugCommand::Wait { seconds }))
}

fn parse_hold_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let action = parse_movement_action(args, "hold <forward|backward|left|right>")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Hold {
        action,
        is_down: true,
    }))
}

fn parse_release_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let action = parse_movement_action(args, "release <forward|backward|left|right>")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Hold {
        action,
        is_down: false,
    }))
}

fn parse_pointer_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "pointer <on|off>";
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one argument <on|off>", USAGE));
    };
    let locked = match raw.to_ascii_lowercase().as_str() {
        "on" | "lock" => true,
        "off" | "unlock" => false,
        _ => {
            return Err(CommandParseError::new(
                format!("unknown pointer state '{raw}' (expected on|off)"),
                USAGE,
            ))
        }
    };
    Ok(ParsedCommand::Queueable(DebugCommand::PointerLock { locked }))
}

fn parse_interact_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "interact")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Press {
        action: PressAction::Interact,
    }))
}

fn parse_flashlight_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "flashlight")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Press {
        action: PressAction::Flashlight,
    }))
}

fn parse_skip_to_room_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let room_index = parse_room_index(args, "skip_to_room <room>")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::SkipToRoom { room_index },
    )))
}

fn parse_goto_room_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let room_index = parse_room_index(args, "goto_room <room>")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::GotoRoom { room_index },
    )))
}

fn parse_teleport_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "teleport <x> <y> <z>";
    let [x, y, z] = args else {
        return Err(CommandParseError::new("expected <x> <y> <z>", USAGE));
    };
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::Teleport {
            x: parse_f32(x, "x coordinate", USAGE)?,
            y: parse_f32(y, "y coordinate", USAGE)?,
            z: parse_f32(z, "z coordinate", USAGE)?,
        },
    )))
}

fn parse_face_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "face <degrees>";
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one argument <degrees>", USAGE));
    };
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::Face {
            yaw_degrees: parse_f32(raw, "yaw", USAGE)?,
        },
    )))
}

fn parse_answer_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError::new(
            "missing required argument <text...>",
            "answer <text...>",
        ));
    }
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::Answer {
            text: args.join(" "),
        },
    )))
}

fn parse_close_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "close")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::ClosePopup,
    )))
}

fn parse_dump_state_command(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "dump_state")?;
    Ok(ParsedCommand::Queueable(DebugCommand::Scene(
        SceneDebugCommand::DumpState,
    )))
}

fn parse_room_index(args: &[String], usage: &str) -> Result<usize, CommandParseError> {
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one argument <room>", usage));
    };
    raw.parse::<usize>().map_err(|_| {
        CommandParseError::new(format!("invalid room index '{raw}' (expected usize)"), usage)
    })
}

fn parse_movement_action(args: &[String], usage: &str) -> Result<InputAction, CommandParseError> {
    let [raw] = args else {
        return Err(CommandParseError::new("expected exactly one argument <direction>", usage));
    };
    InputAction::from_token(raw).ok_or_else(|| {
        CommandParseError::new(
            format!("unknown direction '{raw}' (expected forward|backward|left|right)"),
            usage,
        )
    })
}

fn parse_f32(raw: &str, label: &str, usage: &str) -> Result<f32, CommandParseError> {
    raw.parse::<f32>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandParseError::new(format!("invalid {label} '{raw}' (expected f32)"), usage))
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}
