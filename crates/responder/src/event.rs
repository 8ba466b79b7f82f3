//! The CloudEvents 1.0 event model.
//!
//! An [`Event`] holds the required context attributes as validated newtypes,
//! the optional attributes as plain values, a map of extension attributes, and
//! an optional payload. Only `specversion` `1.0` is representable, so the
//! version is implied rather than stored.
//!
//! The structured JSON format is implemented directly through `Serialize` /
//! `Deserialize`; transport bindings that receive attributes one at a time
//! (HTTP binary mode) go through [`Event::from_attribute_map`].

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{de, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{value::RawValue, Map, Value};

use crate::{EventError, EventId, EventSource, EventType, ExtensionName};

/// The only CloudEvents specification version this crate speaks.
pub const SPEC_VERSION: &str = "1.0";

/// Wire names of the CloudEvents context attributes and payload members.
pub mod attributes {
    pub const SPECVERSION: &str = "specversion";
    pub const ID: &str = "id";
    pub const SOURCE: &str = "source";
    pub const TYPE: &str = "type";
    pub const DATACONTENTTYPE: &str = "datacontenttype";
    pub const DATASCHEMA: &str = "dataschema";
    pub const SUBJECT: &str = "subject";
    pub const TIME: &str = "time";
    pub const DATA: &str = "data";
    pub const DATA_BASE64: &str = "data_base64";
}

// ---------------------------------------------------------------------------
// Extension values
// ---------------------------------------------------------------------------

/// Value of an extension context attribute.
///
/// The JSON event format can carry strings, booleans and integers; the HTTP
/// binary binding carries everything as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    String(String),
    Boolean(bool),
    Integer(i64),
}

impl ExtensionValue {
    /// Converts a JSON member into an extension value.
    ///
    /// Floats, arrays and objects have no CloudEvents type and are rejected.
    fn from_json(name: &str, value: Value) -> Result<Self, EventError> {
        match value {
            Value::String(s) => Ok(Self::String(s)),
            Value::Bool(b) => Ok(Self::Boolean(b)),
            Value::Number(n) => n.as_i64().map(Self::Integer).ok_or_else(|| {
                EventError::InvalidAttribute {
                    name: name.to_owned(),
                }
            }),
            _ => Err(EventError::InvalidAttribute {
                name: name.to_owned(),
            }),
        }
    }

    /// Returns the string payload if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Canonical string encoding, as used by the HTTP binary binding.
impl std::fmt::Display for ExtensionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for ExtensionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ExtensionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ExtensionValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for ExtensionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Event payload.
///
/// The payload is carried, not interpreted: a JSON `data` member keeps its
/// exact source text and a binary-mode body keeps its exact bytes.
#[derive(Debug, Clone)]
pub enum EventData {
    /// The `data` member of a structured-mode event, as written by the sender.
    Json(Box<RawValue>),
    /// Opaque bytes: a binary-mode body or a decoded `data_base64`.
    Binary(Vec<u8>),
}

impl EventData {
    /// Wraps a JSON document, keeping `text` verbatim.
    ///
    /// Fails if `text` is not a single JSON value.
    pub fn json(text: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawValue::from_string(text.into()).map(Self::Json)
    }

    /// Encodes the payload as an HTTP body.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Json(raw) => raw.get().as_bytes().to_vec(),
            Self::Binary(bytes) => bytes.clone(),
        }
    }
}

impl PartialEq for EventData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Json(a), Self::Json(b)) => a.get() == b.get(),
            (Self::Binary(a), Self::Binary(b)) => a == b,
            _ => false,
        }
    }
}

/// Formats `time` as RFC 3339, with `Z` for UTC and only the sub-second digits
/// it carries.
pub fn format_time(time: &DateTime<FixedOffset>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A CloudEvents 1.0 event.
///
/// `Clone` is a deep copy: every attribute and the payload are owned.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Identifies the event; unique per `source`.
    pub id: EventId,

    /// Context in which the event happened.
    pub source: EventSource,

    /// Kind of occurrence.
    pub event_type: EventType,

    /// Media type of `data`.
    pub data_content_type: Option<String>,

    /// URI of the schema `data` adheres to.
    pub data_schema: Option<String>,

    /// Subject of the event within the context of `source`.
    pub subject: Option<String>,

    /// When the occurrence happened. The original offset is kept.
    pub time: Option<DateTime<FixedOffset>>,

    /// Extension attributes, ordered by name.
    pub extensions: BTreeMap<ExtensionName, ExtensionValue>,

    /// Payload.
    pub data: Option<EventData>,
}

impl Event {
    /// Creates an event with only the required attributes set.
    pub fn new(id: EventId, source: EventSource, event_type: EventType) -> Self {
        Self {
            id,
            source,
            event_type,
            data_content_type: None,
            data_schema: None,
            subject: None,
            time: None,
            extensions: BTreeMap::new(),
            data: None,
        }
    }

    /// Returns the value of the named extension attribute.
    pub fn extension(&self, name: &str) -> Option<&ExtensionValue> {
        self.extensions
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }

    /// Sets an extension attribute, replacing any previous value.
    pub fn set_extension(&mut self, name: ExtensionName, value: impl Into<ExtensionValue>) {
        self.extensions.insert(name, value.into());
    }

    /// Builds an event from a map of attribute names to values, with the
    /// payload supplied separately.
    ///
    /// Unknown names become extension attributes. `null` values are treated
    /// as absent. `specversion` must be present and equal to `1.0`.
    pub fn from_attribute_map(
        map: Map<String, Value>,
        data: Option<EventData>,
    ) -> Result<Self, EventError> {
        use attributes::*;

        let mut spec_version = None;
        let mut id = None;
        let mut source = None;
        let mut event_type = None;
        let mut data_content_type = None;
        let mut data_schema = None;
        let mut subject = None;
        let mut time = None;
        let mut extensions = BTreeMap::new();

        for (name, value) in map {
            if value.is_null() {
                continue;
            }
            match name.as_str() {
                SPECVERSION => spec_version = Some(expect_string(&name, value)?),
                ID => id = Some(expect_string(&name, value)?),
                SOURCE => source = Some(expect_string(&name, value)?),
                TYPE => event_type = Some(expect_string(&name, value)?),
                DATACONTENTTYPE => data_content_type = Some(expect_string(&name, value)?),
                DATASCHEMA => data_schema = Some(expect_string(&name, value)?),
                SUBJECT => subject = Some(expect_string(&name, value)?),
                TIME => {
                    let raw = expect_string(&name, value)?;
                    let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| {
                        EventError::InvalidTime {
                            value: raw.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    time = Some(parsed);
                }
                DATA | DATA_BASE64 => {
                    return Err(EventError::InvalidExtensionName { name: name.clone() })
                }
                _ => {
                    let ext = ExtensionName::new(name.clone())
                        .ok_or_else(|| EventError::InvalidExtensionName { name: name.clone() })?;
                    extensions.insert(ext, ExtensionValue::from_json(&name, value)?);
                }
            }
        }

        match spec_version.as_deref() {
            None => return Err(EventError::MissingAttribute { name: SPECVERSION }),
            Some(SPEC_VERSION) => {}
            Some(other) => {
                return Err(EventError::UnsupportedSpecVersion {
                    version: other.to_owned(),
                })
            }
        }

        Ok(Self {
            id: id
                .and_then(EventId::new)
                .ok_or(EventError::MissingAttribute { name: ID })?,
            source: source
                .and_then(EventSource::new)
                .ok_or(EventError::MissingAttribute { name: SOURCE })?,
            event_type: event_type
                .and_then(EventType::new)
                .ok_or(EventError::MissingAttribute { name: TYPE })?,
            data_content_type,
            data_schema,
            subject,
            time,
            extensions,
            data,
        })
    }

    /// Builds an event from the members of a structured-mode JSON object.
    ///
    /// Members are kept as raw JSON so that `data` passes through with its
    /// original text.
    pub fn from_structured(
        mut members: BTreeMap<String, Box<RawValue>>,
    ) -> Result<Self, EventError> {
        let data = members.remove(attributes::DATA).filter(|raw| !is_null(raw));
        let data_base64 = members
            .remove(attributes::DATA_BASE64)
            .filter(|raw| !is_null(raw));

        let data = match (data, data_base64) {
            (Some(_), Some(_)) => return Err(EventError::ConflictingData),
            (Some(raw), None) => Some(EventData::Json(raw)),
            (None, Some(raw)) => {
                let encoded: String =
                    serde_json::from_str(raw.get()).map_err(|_| EventError::InvalidAttribute {
                        name: attributes::DATA_BASE64.to_owned(),
                    })?;
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| EventError::InvalidBase64 {
                        reason: e.to_string(),
                    })?;
                Some(EventData::Binary(bytes))
            }
            (None, None) => None,
        };

        let mut map = Map::new();
        for (name, raw) in members {
            let value: Value = serde_json::from_str(raw.get())
                .map_err(|_| EventError::InvalidAttribute { name: name.clone() })?;
            map.insert(name, value);
        }
        Self::from_attribute_map(map, data)
    }
}

fn is_null(raw: &RawValue) -> bool {
    raw.get().trim() == "null"
}

fn expect_string(name: &str, value: Value) -> Result<String, EventError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(EventError::InvalidAttribute {
            name: name.to_owned(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Structured JSON format
// ---------------------------------------------------------------------------

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use attributes::*;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(SPECVERSION, SPEC_VERSION)?;
        map.serialize_entry(ID, &self.id)?;
        map.serialize_entry(SOURCE, &self.source)?;
        map.serialize_entry(TYPE, &self.event_type)?;
        if let Some(ct) = &self.data_content_type {
            map.serialize_entry(DATACONTENTTYPE, ct)?;
        }
        if let Some(schema) = &self.data_schema {
            map.serialize_entry(DATASCHEMA, schema)?;
        }
        if let Some(subject) = &self.subject {
            map.serialize_entry(SUBJECT, subject)?;
        }
        if let Some(time) = &self.time {
            map.serialize_entry(TIME, &format_time(time))?;
        }
        for (name, value) in &self.extensions {
            map.serialize_entry(name.as_str(), value)?;
        }
        match &self.data {
            Some(EventData::Json(raw)) => map.serialize_entry(DATA, raw)?,
            Some(EventData::Binary(bytes)) => {
                map.serialize_entry(DATA_BASE64, &STANDARD.encode(bytes))?
            }
            None => {}
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let members = BTreeMap::<String, Box<RawValue>>::deserialize(deserializer)?;
        Self::from_structured(members).map_err(de::Error::custom)
    }
}
