//! Coinflip reply domain.
//!
//! This crate contains the event model, the randomness port, and the transform
//! that turns an inbound event into its reply. Transport crates decode events
//! into [`Event`] and encode the result; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Randomness is reached only through the [`Coin`] trait and the process
//! identity is passed in, so the transform is deterministic under test.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Attribute newtypes (`EventId`, `EventType`, ...) and `InstanceId` |
//! | [`event`] | The CloudEvents 1.0 [`Event`] and its structured JSON format |
//! | [`coin`] | [`Outcome`], the [`Coin`] port and its implementations |
//! | [`responder`] | [`Responder`], the reply transform |
//! | [`errors`] | [`EventError`] |

pub mod coin;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod responder;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use coin::{Coin, FixedCoin, Outcome, SeededCoin};
pub use errors::EventError;
pub use event::{format_time, Event, EventData, ExtensionValue, SPEC_VERSION};
pub use identifiers::{EventId, EventSource, EventType, ExtensionName, InstanceId};
pub use responder::{Responder, FLIP_EXTENSION, REPLY_TYPE, RESPONDER_NAME};
