//! flowgrid-select — the FlowGrid selection engine.
//!
//! Given an outbound message and the live candidate-connection list for
//! a port, a selector returns the subset of connections that should
//! receive the message. Selection sits on the hot per-message path: it
//! is synchronous, non-blocking computation, with the PRNG draw and the
//! round-robin cursor as the only mutable state (serialized internally,
//! so one selector instance is safe under concurrent producers).
//!
//! # Strategies
//!
//! - **random** — uniform single pick
//! - **fields** — consistent hash of a named message field; the
//!   partitioning guarantee that equal field values land on the same
//!   downstream instance within a topology version
//! - **round-robin** — cycling cursor, rolling over without reset when
//!   the candidate count changes
//! - **broadcast** — every candidate
//!
//! Dispatching to zero targets is always an error, never a silent
//! no-op: an empty candidate list fails with
//! [`SelectError::EmptyTarget`], and a fields selection without the
//! named field fails with [`SelectError::MissingField`].
//!
//! Strategies are a closed tagged set ([`Selector`]) constructed from
//! the serializable `SelectorConfig` form through a
//! [`SelectorRegistry`] keyed by grouping discriminator.

pub mod error;
pub mod message;
pub mod registry;
pub mod selector;

pub use error::{SelectError, SelectResult};
pub use message::Message;
pub use registry::SelectorRegistry;
pub use selector::{
    BroadcastSelector, FieldsSelector, RandomSelector, RoundRobinSelector, Selector,
};
