//! The event transformer.
//!
//! [`Responder::respond`] turns an inbound event into the reply: a deep copy
//! whose `type`, `source` and `flip` extension are overwritten. Everything else
//! (id, subject, time, payload, other extensions) passes through untouched.
//!
//! ## Observability
//!
//! Each call opens a `receive` span with a child `flip` span; the child carries
//! a `flipped` event with the drawn `result`. Spans go to whatever `tracing`
//! subscriber is installed, and are no-ops when none is.

use crate::{Coin, Event, EventSource, EventType, ExtensionName, InstanceId, Outcome};

/// Prefix of the `source` attribute on every reply.
pub const RESPONDER_NAME: &str = "knative.dev/eventing/cmd/coinflip";

/// The `type` attribute set on every reply.
pub const REPLY_TYPE: &str = "coinflip";

/// Name of the extension attribute carrying the flip outcome.
pub const FLIP_EXTENSION: &str = "flip";

/// Produces reply events.
///
/// Holds only immutable state plus the injected [`Coin`], so one instance is
/// shared by every concurrent request.
pub struct Responder {
    instance: InstanceId,
    source: EventSource,
    reply_type: EventType,
    flip_extension: ExtensionName,
    coin: Box<dyn Coin>,
}

impl Responder {
    /// Creates a responder identified by `instance` and drawing from `coin`.
    pub fn new(instance: InstanceId, coin: Box<dyn Coin>) -> Self {
        Self {
            instance,
            source: EventSource(format!("{RESPONDER_NAME}/{instance}")),
            reply_type: EventType(REPLY_TYPE.to_owned()),
            flip_extension: ExtensionName(FLIP_EXTENSION.to_owned()),
            coin,
        }
    }

    /// Returns the process identity embedded in reply sources.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Returns the `source` attribute stamped on every reply.
    pub fn source(&self) -> &EventSource {
        &self.source
    }

    /// Builds the reply to `event`.
    #[tracing::instrument(
        name = "receive",
        skip_all,
        fields(event.id = %event.id, event.type = %event.event_type, flip = tracing::field::Empty)
    )]
    pub fn respond(&self, event: &Event) -> Event {
        let mut reply = event.clone();
        reply.event_type = self.reply_type.clone();
        reply.source = self.source.clone();

        let outcome = self.flip();
        tracing::Span::current().record("flip", outcome.as_str());
        reply.set_extension(self.flip_extension.clone(), outcome.as_str());
        reply
    }

    fn flip(&self) -> Outcome {
        let span = tracing::info_span!("flip");
        let _guard = span.enter();

        let outcome = self.coin.flip();
        tracing::info!(result = outcome.as_str(), "flipped");
        outcome
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("instance", &self.instance)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
