//! Messages exchanged with the hosting page.
//!
//! - [`events`]: the event-bus contract (outbound scanner events, inbound
//!   host lifecycle events).
//! - [`transform`]: serialisable value-rewriting rules that can cross the
//!   client/server boundary without evaluating code.

pub mod events;
pub mod transform;
