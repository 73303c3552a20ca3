//! Event encoding: reduces a raw UI interaction to the fixed field set the
//! server understands.
//!
//! Only the allow-listed fields in [`SNAPSHOT_FIELDS`] are copied. Everything
//! else on the source object is discarded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire names of every field in an [`EventSnapshot`], in wire order.
pub const SNAPSHOT_FIELDS: [&str; 13] = [
    "type",
    "altKey",
    "button",
    "buttons",
    "clientX",
    "clientY",
    "ctrlKey",
    "metaKey",
    "movementX",
    "movementY",
    "screenX",
    "screenY",
    "shiftKey",
];

/// Anything that can be read like a DOM event object.
pub trait RawEvent {
    /// Value of the named field, or `None` if the source does not carry it.
    fn field(&self, name: &str) -> Option<Value>;
}

impl RawEvent for Value {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl RawEvent for Map<String, Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Structurally typed copy of a UI interaction. Values are copied verbatim from
/// the source; fields the source lacks are `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    #[serde(rename = "type", default)]
    pub kind: Value,
    #[serde(default)]
    pub alt_key: Value,
    #[serde(default)]
    pub button: Value,
    #[serde(default)]
    pub buttons: Value,
    #[serde(default)]
    pub client_x: Value,
    #[serde(default)]
    pub client_y: Value,
    #[serde(default)]
    pub ctrl_key: Value,
    #[serde(default)]
    pub meta_key: Value,
    #[serde(default)]
    pub movement_x: Value,
    #[serde(default)]
    pub movement_y: Value,
    #[serde(default)]
    pub screen_x: Value,
    #[serde(default)]
    pub screen_y: Value,
    #[serde(default)]
    pub shift_key: Value,
}

/// Build the snapshot for one interaction.
pub fn encode<E: RawEvent + ?Sized>(raw: &E) -> EventSnapshot {
    let field = |name: &str| raw.field(name).unwrap_or(Value::Null);

    EventSnapshot {
        kind: field("type"),
        alt_key: field("altKey"),
        button: field("button"),
        buttons: field("buttons"),
        client_x: field("clientX"),
        client_y: field("clientY"),
        ctrl_key: field("ctrlKey"),
        meta_key: field("metaKey"),
        movement_x: field("movementX"),
        movement_y: field("movementY"),
        screen_x: field("screenX"),
        screen_y: field("screenY"),
        shift_key: field("shiftKey"),
    }
}

/// A typed mouse interaction for callers that do not start from a DOM object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub alt_key: bool,
    pub button: i16,
    pub buttons: u16,
    pub client_x: i32,
    pub client_y: i32,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub movement_x: i32,
    pub movement_y: i32,
    pub screen_x: i32,
    pub screen_y: i32,
    pub shift_key: bool,
}

impl MouseEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// A primary-button click with no modifiers at the origin.
    pub fn click() -> Self {
        Self::new("click")
    }
}

impl RawEvent for MouseEvent {
    fn field(&self, name: &str) -> Option<Value> {
        let value = match name {
            "type" => Value::from(self.kind.as_str()),
            "altKey" => Value::from(self.alt_key),
            "button" => Value::from(self.button),
            "buttons" => Value::from(self.buttons),
            "clientX" => Value::from(self.client_x),
            "clientY" => Value::from(self.client_y),
            "ctrlKey" => Value::from(self.ctrl_key),
            "metaKey" => Value::from(self.meta_key),
            "movementX" => Value::from(self.movement_x),
            "movementY" => Value::from(self.movement_y),
            "screenX" => Value::from(self.screen_x),
            "screenY" => Value::from(self.screen_y),
            "shiftKey" => Value::from(self.shift_key),
            _ => return None,
        };
        Some(value)
    }
}
