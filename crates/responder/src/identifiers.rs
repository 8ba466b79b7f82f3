//! Newtype identifiers for event attributes and the running process.
//!
//! Each CloudEvents context attribute that carries identity is a distinct
//! newtype wrapping a `String`, so an [`EventType`] can never be passed where an
//! [`EventSource`] is expected even though both are plain text on the wire.
//! Construction validates the CloudEvents rule for that attribute and returns
//! `None` on violation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for non-empty String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// The field is crate-visible so fixed, known-valid values can be built
// without going through the Option.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub(crate) String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Event context attributes
// ---------------------------------------------------------------------------

string_id! {
    /// The `id` attribute of an event.
    ///
    /// `source` + `id` is unique per distinct event. Replies keep the inbound
    /// `id` as their correlation key.
    EventId
}

string_id! {
    /// The `source` attribute of an event: a URI-reference naming the context
    /// in which the event happened.
    EventSource
}

string_id! {
    /// The `type` attribute of an event (e.g. `"dev.knative.sample"`).
    ///
    /// Triggers filter on this value.
    EventType
}

// ---------------------------------------------------------------------------

/// Name of an extension context attribute.
///
/// CloudEvents restricts attribute names to lower-case ASCII letters and
/// digits. Names are not length-checked; the 20-character limit is advisory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExtensionName(pub(crate) String);

impl ExtensionName {
    /// Creates an extension name, returning `None` if `name` is empty or
    /// contains anything other than `a-z` and `0-9`.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let n = name.into();
        let valid = !n.is_empty()
            && n.bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        if valid {
            Some(Self(n))
        } else {
            None
        }
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExtensionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Process identity
// ---------------------------------------------------------------------------

/// Identifies one running responder process.
///
/// Generated once at startup and embedded in the `source` of every reply so
/// that replies from different replicas can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Generates a new random instance identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an [`InstanceId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
