use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::app::Vec3;

use super::blueprint::{
    AnchorOverride, KeyBlueprint, KeyGate, LetterBlueprint, MansionBlueprint, ObjectBlueprint,
    ObjectiveBlueprint, RiddleBlueprint, RoomBlueprint,
};

pub const BUILTIN_MANSION_XML: &str = include_str!("../../../../assets/base/rooms.xml");
pub const BUILTIN_MANSION_PATH: &str = "<builtin>/assets/base/rooms.xml";

const ANCHOR_ATTRIBUTES: [&str; 8] = [
    "x",
    "y",
    "z",
    "relativeToFloor",
    "rotationY",
    "bobAmplitude",
    "bobSpeed",
    "scale",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    EmptyMansion,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

pub fn builtin_mansion_blueprint() -> Result<MansionBlueprint, ContentCompileError> {
    compile_mansion_blueprint(Path::new(BUILTIN_MANSION_PATH), BUILTIN_MANSION_XML)
}

pub fn load_mansion_blueprint(file_path: &Path) -> Result<MansionBlueprint, ContentCompileError> {
    let raw = fs::read_to_string(file_path).map_err(|source| ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        file_path: file_path.to_path_buf(),
        location: None,
    })?;
    compile_mansion_blueprint(file_path, &raw)
}

pub fn compile_mansion_blueprint(
    file_path: &Path,
    raw: &str,
) -> Result<MansionBlueprint, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = Ctx {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Mansion" {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Mansion>".to_string(),
            root,
        ));
    }

    let mut rooms = Vec::<RoomBlueprint>::new();
    let mut next_links = Vec::<(usize, Node<'_, '_>)>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "Room" {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownElement,
                format!(
                    "unsupported element <{}>; <Mansion> holds only <Room>",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        let room = parse_room(&ctx, child)?;
        if let Some(next) = room.next_room {
            next_links.push((next, child));
        }
        rooms.push(room);
    }

    if rooms.is_empty() {
        return Err(ctx.error_at(
            ContentErrorCode::EmptyMansion,
            "<Mansion> must declare at least one <Room>".to_string(),
            root,
        ));
    }
    for (next, node) in next_links {
        if next >= rooms.len() {
            return Err(ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!(
                    "next room {next} is out of range; mansion has {} rooms",
                    rooms.len()
                ),
                node,
            ));
        }
    }

    info!(
        file = %file_path.display(),
        room_count = rooms.len(),
        "mansion_blueprint_compiled"
    );
    Ok(MansionBlueprint { rooms })
}

struct Ctx<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl Ctx<'_, '_> {
    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_attr(&self, node: Node<'_, '_>, name: &str) -> Result<String, ContentCompileError> {
        let value = node.attribute(name).map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(self.error_at(
                ContentErrorCode::MissingField,
                format!(
                    "missing required attribute '{name}' on <{}>",
                    node.tag_name().name()
                ),
                node,
            ));
        }
        Ok(value.to_string())
    }

    fn optional_f32(&self, node: Node<'_, '_>, name: &str) -> Result<Option<f32>, ContentCompileError> {
        let Some(raw) = node.attribute(name) else {
            return Ok(None);
        };
        let parsed = raw.trim().parse::<f32>().ok().filter(|value| value.is_finite());
        match parsed {
            Some(value) => Ok(Some(value)),
            None => Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("attribute '{name}' value '{raw}' is not a finite number"),
                node,
            )),
        }
    }

    fn required_f32(&self, node: Node<'_, '_>, name: &str) -> Result<f32, ContentCompileError> {
        self.optional_f32(node, name)?.ok_or_else(|| {
            self.error_at(
                ContentErrorCode::MissingField,
                format!(
                    "missing required attribute '{name}' on <{}>",
                    node.tag_name().name()
                ),
                node,
            )
        })
    }

    fn optional_range(&self, node: Node<'_, '_>) -> Result<Option<f32>, ContentCompileError> {
        let range = self.optional_f32(node, "range")?;
        if range.is_some_and(|value| value <= 0.0) {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                "range must be > 0".to_string(),
                node,
            ));
        }
        Ok(range)
    }

    fn optional_bool(&self, node: Node<'_, '_>, name: &str) -> Result<Option<bool>, ContentCompileError> {
        match node.attribute(name).map(str::trim) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("attribute '{name}' value '{other}' must be true|false"),
                node,
            )),
        }
    }

    fn vec3(&self, node: Node<'_, '_>) -> Result<Vec3, ContentCompileError> {
        Ok(Vec3::new(
            self.required_f32(node, "x")?,
            self.required_f32(node, "y")?,
            self.required_f32(node, "z")?,
        ))
    }

    fn element_text(&self, node: Node<'_, '_>) -> Result<String, ContentCompileError> {
        let text = collapse_text(node.text().unwrap_or_default());
        if text.is_empty() {
            return Err(self.error_at(
                ContentErrorCode::MissingField,
                format!("element <{}> must not be empty", node.tag_name().name()),
                node,
            ));
        }
        Ok(text)
    }
}

fn parse_room(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<RoomBlueprint, ContentCompileError> {
    let name = ctx.required_attr(node, "name")?;
    let script = ctx.required_attr(node, "script")?;
    let next_room = match node.attribute("next").map(str::trim) {
        None | Some("none") => None,
        Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
            ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!("next room '{raw}' must be a room index or 'none'"),
                node,
            )
        })?),
    };
    let reset_on_enter = ctx.optional_bool(node, "resetOnEnter")?.unwrap_or(false);

    let mut seen_fields = HashSet::<String>::new();
    let mut seen_object_ids = HashSet::<String>::new();
    let mut position: Option<Vec3> = None;
    let mut size: Option<Vec3> = None;
    let mut door: Option<Vec3> = None;
    let mut key: Option<KeyBlueprint> = None;
    let mut riddle: Option<RiddleBlueprint> = None;
    let mut letter: Option<LetterBlueprint> = None;
    let mut heart_anchor = AnchorOverride::default();
    let mut letter_anchor = AnchorOverride::default();
    let mut objects = Vec::<ObjectBlueprint>::new();
    let mut objectives = Vec::<ObjectiveBlueprint>::new();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        let repeatable = matches!(field_name.as_str(), "object" | "objective");
        if !repeatable && !seen_fields.insert(field_name.clone()) {
            return Err(ctx.error_at(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{field_name}> in <Room name=\"{name}\">"),
                field,
            ));
        }

        match field_name.as_str() {
            "position" => position = Some(ctx.vec3(field)?),
            "size" => {
                let parsed = ctx.vec3(field)?;
                if parsed.x <= 0.0 || parsed.y <= 0.0 || parsed.z <= 0.0 {
                    return Err(ctx.error_at(
                        ContentErrorCode::InvalidValue,
                        "room size must be positive on every axis".to_string(),
                        field,
                    ));
                }
                size = Some(parsed);
            }
            "door" => door = Some(ctx.vec3(field)?),
            "key" => {
                let raw_gate = ctx.required_attr(field, "gate")?;
                let gate = KeyGate::from_token(&raw_gate).ok_or_else(|| {
                    ctx.error_at(
                        ContentErrorCode::InvalidValue,
                        format!(
                            "invalid key gate '{raw_gate}'; allowed values: riddle, chain, possession"
                        ),
                        field,
                    )
                })?;
                key = Some(KeyBlueprint {
                    position: ctx.vec3(field)?,
                    gate,
                    range: ctx.optional_range(field)?,
                });
            }
            "riddle" => riddle = Some(parse_riddle(ctx, field)?),
            "heartAnchor" => heart_anchor = parse_anchor(ctx, field)?,
            "letterAnchor" => letter_anchor = parse_anchor(ctx, field)?,
            "object" => {
                let id = ctx.required_attr(field, "id")?;
                if !seen_object_ids.insert(id.clone()) {
                    return Err(ctx.error_at(
                        ContentErrorCode::DuplicateField,
                        format!("duplicate object id '{id}' in <Room name=\"{name}\">"),
                        field,
                    ));
                }
                objects.push(ObjectBlueprint {
                    id,
                    position: ctx.vec3(field)?,
                    range: ctx.optional_range(field)?,
                });
            }
            "objective" => objectives.push(ObjectiveBlueprint {
                id: ctx.required_attr(field, "id")?,
                label: ctx.element_text(field)?,
            }),
            "letter" => {
                letter = Some(LetterBlueprint {
                    title: ctx.required_attr(field, "title")?,
                    body: letter_body(field),
                })
            }
            _ => {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <Room>"),
                    field,
                ))
            }
        }
    }

    let missing = |field: &str| {
        ctx.error_at(
            ContentErrorCode::MissingField,
            format!("missing required field <{field}> in <Room name=\"{name}\">"),
            node,
        )
    };
    let position = position.ok_or_else(|| missing("position"))?;
    let size = size.ok_or_else(|| missing("size"))?;
    let door = door.ok_or_else(|| missing("door"))?;
    let key = key.ok_or_else(|| missing("key"))?;
    let letter = letter.ok_or_else(|| missing("letter"))?;

    if key.gate == KeyGate::Riddle && riddle.is_none() {
        return Err(ctx.error_at(
            ContentErrorCode::MissingField,
            format!("room '{name}' gates its key on a riddle but declares no <riddle>"),
            node,
        ));
    }

    Ok(RoomBlueprint {
        name,
        script,
        position,
        size,
        door,
        key,
        riddle,
        next_room,
        reset_on_enter,
        heart_anchor,
        letter_anchor,
        objects,
        objectives,
        letter,
    })
}

fn parse_riddle(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<RiddleBlueprint, ContentCompileError> {
    let mut question: Option<String> = None;
    let mut answer: Option<String> = None;
    for child in node.children().filter(|child| child.is_element()) {
        match child.tag_name().name() {
            "question" if question.is_none() => question = Some(ctx.element_text(child)?),
            "answer" if answer.is_none() => {
                answer = Some(ctx.element_text(child)?.to_lowercase())
            }
            "question" | "answer" => {
                return Err(ctx.error_at(
                    ContentErrorCode::DuplicateField,
                    format!("duplicate field <{}> in <riddle>", child.tag_name().name()),
                    child,
                ))
            }
            other => {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{other}> in <riddle>"),
                    child,
                ))
            }
        }
    }
    let Some(question) = question else {
        return Err(ctx.error_at(
            ContentErrorCode::MissingField,
            "missing required field <question> in <riddle>".to_string(),
            node,
        ));
    };
    let Some(answer) = answer else {
        return Err(ctx.error_at(
            ContentErrorCode::MissingField,
            "missing required field <answer> in <riddle>".to_string(),
            node,
        ));
    };
    Ok(RiddleBlueprint {
        question,
        answer,
        position: ctx.vec3(node)?,
        range: ctx.optional_range(node)?,
    })
}

fn parse_anchor(ctx: &Ctx<'_, '_>, node: Node<'_, '_>) -> Result<AnchorOverride, ContentCompileError> {
    for attribute in node.attributes() {
        if !ANCHOR_ATTRIBUTES.contains(&attribute.name()) {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownField,
                format!(
                    "unknown attribute '{}' on <{}>",
                    attribute.name(),
                    node.tag_name().name()
                ),
                node,
            ));
        }
    }
    Ok(AnchorOverride {
        x: ctx.optional_f32(node, "x")?,
        y: ctx.optional_f32(node, "y")?,
        z: ctx.optional_f32(node, "z")?,
        relative_to_floor: ctx.optional_bool(node, "relativeToFloor")?,
        rotation_y: ctx.optional_f32(node, "rotationY")?,
        bob_amplitude: ctx.optional_f32(node, "bobAmplitude")?,
        bob_speed: ctx.optional_f32(node, "bobSpeed")?,
        scale: ctx.optional_f32(node, "scale")?,
    })
}

/// Letter bodies keep paragraph breaks (blank lines) but collapse wrapping inside them.
fn letter_body(node: Node<'_, '_>) -> String {
    let mut paragraphs = Vec::<String>::new();
    let mut current = Vec::<&str>::new();
    for line in node.text().unwrap_or_default().lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(collapse_text(&current.join(" ")));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(collapse_text(&current.join(" ")));
    }
    paragraphs.join("\n\n")
}

fn collapse_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const MINIMAL_ROOM: &str = r#"
        <position x="0" y="0" z="0"/>
        <size x="9.2" y="8" z="13.2"/>
        <door x="0" y="0" z="-6.4"/>
        <key x="1" y="0.55" z="1" gate="chain"/>
        <letter title="Letter">Body</letter>"#;

    fn compile(raw: &str) -> Result<MansionBlueprint, ContentCompileError> {
        compile_mansion_blueprint(Path::new("rooms.xml"), raw)
    }

    fn single_room(extra: &str) -> String {
        format!(
            r#"<Mansion><Room name="Only" script="labs">{MINIMAL_ROOM}{extra}</Room></Mansion>"#
        )
    }

    #[test]
    fn builtin_blueprint_compiles_four_linked_rooms() {
        let mansion = builtin_mansion_blueprint().expect("builtin");
        assert_eq!(mansion.room_count(), 4);
        assert_eq!(mansion.rooms[0].next_room, Some(1));
        assert_eq!(mansion.rooms[3].next_room, None);
        assert_eq!(mansion.rooms[0].key.gate, KeyGate::Possession);
        assert_eq!(mansion.rooms[1].key.gate, KeyGate::Riddle);
        assert_eq!(
            mansion.rooms[0].riddle.as_ref().map(|riddle| riddle.answer.as_str()),
            Some("candle")
        );
        assert!(mansion.rooms[3].reset_on_enter);
        assert!(mansion.rooms[2].object("cooking_pot").is_some());
    }

    #[test]
    fn minimal_room_uses_defaults() {
        let mansion = compile(&single_room("")).expect("compile");
        let room = &mansion.rooms[0];
        assert_eq!(room.next_room, None);
        assert!(!room.reset_on_enter);
        assert_eq!(room.heart_anchor, AnchorOverride::default());
        assert!(room.riddle.is_none());
    }

    #[test]
    fn letter_body_keeps_paragraphs() {
        let raw = r#"<Mansion><Room name="Only" script="labs">
                <position x="0" y="0" z="0"/>
                <size x="9.2" y="8" z="13.2"/>
                <door x="0" y="0" z="-6.4"/>
                <key x="1" y="0.55" z="1" gate="chain"/>
                <letter title="T">
                    First line
                    wraps here.

                    Second.
                </letter>
            </Room></Mansion>"#;
        let mansion = compile(raw).expect("compile");
        assert_eq!(mansion.rooms[0].letter.body, "First line wraps here.\n\nSecond.");
    }

    #[test]
    fn missing_field_reports_location() {
        let err = compile(r#"<Mansion><Room name="A" script="labs"><size x="1" y="1" z="1"/></Room></Mansion>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert!(err.location.is_some());
        assert!(err.message.contains("<position>"));
    }

    #[test]
    fn unknown_field_and_duplicate_field_error() {
        let err = compile(&single_room(r#"<mood>grim</mood>"#)).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);

        let err = compile(&single_room(r#"<door x="0" y="0" z="0"/>"#)).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateField);

        let err = compile(&single_room(
            r#"<object id="fan" x="0" y="0" z="0"/><object id="fan" x="1" y="0" z="0"/>"#,
        ))
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateField);
    }

    #[test]
    fn invalid_values_error() {
        let err = compile(&single_room(r#"<heartAnchor x="abc"/>"#)).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);

        let err = compile(&single_room(r#"<letterAnchor wobble="1"/>"#)).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);

        let raw = single_room("").replace(r#"gate="chain""#, r#"gate="magic""#);
        let err = compile(&raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn riddle_gate_requires_riddle() {
        let raw = single_room("").replace(r#"gate="chain""#, r#"gate="riddle""#);
        let err = compile(&raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);

        let with_riddle = raw.replace(
            "</Room>",
            r#"<riddle x="0" y="0.5" z="0"><question>Q?</question><answer> Middle </answer></riddle></Room>"#,
        );
        let mansion = compile(&with_riddle).expect("compile");
        let riddle = mansion.rooms[0].riddle.as_ref().expect("riddle");
        assert_eq!(riddle.answer, "middle");
    }

    #[test]
    fn next_room_must_exist() {
        let raw = single_room("").replace(r#"script="labs""#, r#"script="labs" next="3""#);
        let err = compile(&raw).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn root_and_children_are_checked() {
        let err = compile("<Rooms/>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidRoot);

        let err = compile("<Mansion><Hall/></Mansion>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownElement);

        let err = compile("<Mansion></Mansion>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::EmptyMansion);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = compile("<Mansion><Room></Mansion>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn load_reads_file_and_reports_missing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("rooms.xml");
        fs::write(&path, single_room("")).expect("write");
        let mansion = load_mansion_blueprint(&path).expect("load");
        assert_eq!(mansion.rooms[0].name, "Only");

        let err = load_mansion_blueprint(&temp.path().join("missing.xml")).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::ReadFile);
        assert!(err.file_path.ends_with("missing.xml"));
    }
}
