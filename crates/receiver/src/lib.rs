//! Coinflip event receiver infrastructure.
//!
//! Accepts CloudEvents over HTTP, hands each one to a [`responder::Responder`],
//! and writes the reply back in the HTTP response. Both content modes of the
//! CloudEvents HTTP binding are supported (see [`binding`]).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Header and body codecs, routing, body limits and
//! trace-context propagation live here. The [`responder`] crate sees only
//! decoded [`responder::Event`] values.
//!
//! ## Request Flow
//!
//! | Step | Where |
//! |------|-------|
//! | Server span, parented on inbound `traceparent` | [`server::router`], [`propagation`] |
//! | Decode binary or structured event | [`binding::decode`] |
//! | Build reply | [`responder::Responder::respond`] |
//! | Encode reply in the request's mode | [`binding::encode`] |

pub mod binding;
pub mod errors;
pub mod percent;
pub mod propagation;
pub mod server;

pub use binding::{ContentMode, STRUCTURED_JSON};
pub use errors::{Problem, ReceiveError};
pub use server::{router, serve, ReceiverState, MAX_BODY_BYTES};
