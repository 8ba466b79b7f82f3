//! CloudEvents HTTP protocol binding.
//!
//! Two content modes are understood:
//!
//! - **Structured**: `Content-Type: application/cloudevents+json`; the body is
//!   the whole event in the JSON event format.
//! - **Binary**: context attributes travel as `ce-<name>` headers, the data
//!   content type as `Content-Type`, and the data as the body.
//!
//! Replies are written in the mode the request arrived in.

use axum::{
    http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use responder::{event::attributes, format_time, Event, EventData, SPEC_VERSION};
use serde_json::{value::RawValue, Map, Value};

use crate::{percent, ReceiveError};

/// Media type of a structured-mode JSON event.
pub const STRUCTURED_JSON: &str = "application/cloudevents+json";

const STRUCTURED_PREFIX: &str = "application/cloudevents";
const HEADER_PREFIX: &str = "ce-";

/// How an event is laid out in an HTTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    Binary,
    Structured,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Reads an event out of request headers and body.
pub fn decode(headers: &HeaderMap, body: &[u8]) -> Result<(Event, ContentMode), ReceiveError> {
    let content_type = header_str(headers, CONTENT_TYPE.as_str())?;

    if let Some(ct) = content_type {
        let essence = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        if essence.starts_with(STRUCTURED_PREFIX) {
            if essence != STRUCTURED_JSON {
                return Err(ReceiveError::UnsupportedMediaType {
                    content_type: ct.to_owned(),
                });
            }
            return Ok((decode_structured(body)?, ContentMode::Structured));
        }
    }

    let spec_version_header = format!("{HEADER_PREFIX}{}", attributes::SPECVERSION);
    if !headers.contains_key(spec_version_header.as_str()) {
        return Err(ReceiveError::NotACloudEvent);
    }
    Ok((decode_binary(headers, content_type, body)?, ContentMode::Binary))
}

fn decode_structured(body: &[u8]) -> Result<Event, ReceiveError> {
    let raw: &RawValue = serde_json::from_slice(body).map_err(|e| ReceiveError::MalformedJson {
        reason: e.to_string(),
    })?;
    if !raw.get().starts_with('{') {
        return Err(responder::EventError::NotAnObject.into());
    }
    let members = serde_json::from_str(raw.get()).map_err(|e| ReceiveError::MalformedJson {
        reason: e.to_string(),
    })?;
    Ok(Event::from_structured(members)?)
}

fn decode_binary(
    headers: &HeaderMap,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<Event, ReceiveError> {
    let mut map = Map::new();
    for (name, value) in headers {
        let Some(attribute) = name.as_str().strip_prefix(HEADER_PREFIX) else {
            continue;
        };
        let decoded = value
            .to_str()
            .ok()
            .and_then(percent::decode)
            .ok_or_else(|| ReceiveError::InvalidHeader {
                name: name.as_str().to_owned(),
            })?;
        map.insert(attribute.to_owned(), Value::String(decoded));
    }
    if let Some(ct) = content_type {
        map.insert(
            attributes::DATACONTENTTYPE.to_owned(),
            Value::String(ct.to_owned()),
        );
    }

    let data = (!body.is_empty()).then(|| EventData::Binary(body.to_vec()));
    Ok(Event::from_attribute_map(map, data)?)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ReceiveError> {
    headers
        .get(name)
        .map(|v| {
            v.to_str().map_err(|_| ReceiveError::InvalidHeader {
                name: name.to_owned(),
            })
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Writes `event` as a `200 OK` response in the given mode.
pub fn encode(event: &Event, mode: ContentMode) -> Result<Response, ReceiveError> {
    match mode {
        ContentMode::Structured => encode_structured(event),
        ContentMode::Binary => encode_binary(event),
    }
}

fn encode_structured(event: &Event) -> Result<Response, ReceiveError> {
    let body = serde_json::to_vec(event).map_err(|e| ReceiveError::Encode {
        reason: e.to_string(),
    })?;
    let headers = [(
        CONTENT_TYPE,
        HeaderValue::from_static("application/cloudevents+json; charset=utf-8"),
    )];
    Ok((StatusCode::OK, headers, body).into_response())
}

fn encode_binary(event: &Event) -> Result<Response, ReceiveError> {
    let mut headers = HeaderMap::new();
    for (name, value) in header_attributes(event) {
        let header = format!("{HEADER_PREFIX}{name}");
        let header_name =
            HeaderName::from_bytes(header.as_bytes()).map_err(|e| ReceiveError::Encode {
                reason: format!("{header}: {e}"),
            })?;
        let header_value =
            HeaderValue::from_str(&percent::encode(&value)).map_err(|e| ReceiveError::Encode {
                reason: format!("{header}: {e}"),
            })?;
        headers.insert(header_name, header_value);
    }

    if let Some(ct) = &event.data_content_type {
        let value = HeaderValue::from_str(ct).map_err(|e| ReceiveError::Encode {
            reason: format!("content-type: {e}"),
        })?;
        headers.insert(CONTENT_TYPE, value);
    }

    let body = event.data.as_ref().map(EventData::to_bytes).unwrap_or_default();
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Every context attribute except `datacontenttype`, in wire form.
fn header_attributes(event: &Event) -> Vec<(String, String)> {
    let mut out = vec![
        (attributes::SPECVERSION.to_owned(), SPEC_VERSION.to_owned()),
        (attributes::ID.to_owned(), event.id.to_string()),
        (attributes::SOURCE.to_owned(), event.source.to_string()),
        (attributes::TYPE.to_owned(), event.event_type.to_string()),
    ];
    if let Some(schema) = &event.data_schema {
        out.push((attributes::DATASCHEMA.to_owned(), schema.clone()));
    }
    if let Some(subject) = &event.subject {
        out.push((attributes::SUBJECT.to_owned(), subject.clone()));
    }
    if let Some(time) = &event.time {
        out.push((attributes::TIME.to_owned(), format_time(time)));
    }
    for (name, value) in &event.extensions {
        out.push((name.to_string(), value.to_string()));
    }
    out
}
