//! Error type for building and decoding events.
//!
//! The transform itself cannot fail. [`EventError`] covers the only fallible
//! step in the domain: turning untrusted attribute values into an [`Event`]
//! (structured JSON decoding, or attribute-by-attribute construction by a
//! transport binding).
//!
//! [`Event`]: crate::Event

use thiserror::Error;

/// Reasons an inbound payload could not be turned into an [`Event`].
///
/// [`Event`]: crate::Event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// A required context attribute (`id`, `source`, `specversion`, `type`)
    /// was absent or empty.
    #[error("Missing required attribute '{name}'")]
    MissingAttribute {
        /// Attribute name as it appears on the wire.
        name: &'static str,
    },

    /// The `specversion` attribute named a version other than `1.0`.
    #[error("Unsupported specversion '{version}'")]
    UnsupportedSpecVersion {
        /// The version string received.
        version: String,
    },

    /// A context attribute held a value of the wrong JSON kind.
    #[error("Attribute '{name}' has an invalid value")]
    InvalidAttribute {
        /// Attribute name as it appears on the wire.
        name: String,
    },

    /// An extension attribute name contained characters outside `a-z0-9`.
    #[error("Invalid extension attribute name '{name}'")]
    InvalidExtensionName {
        /// The offending name.
        name: String,
    },

    /// The `time` attribute was not an RFC 3339 timestamp.
    #[error("Invalid time '{value}': {reason}")]
    InvalidTime {
        /// The value received.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// Both `data` and `data_base64` were present in a structured event.
    #[error("Event carries both 'data' and 'data_base64'")]
    ConflictingData,

    /// `data_base64` was not valid base64.
    #[error("Invalid data_base64: {reason}")]
    InvalidBase64 {
        /// Decoder message.
        reason: String,
    },

    /// A structured event body was not a JSON object.
    #[error("Structured event must be a JSON object")]
    NotAnObject,
}
