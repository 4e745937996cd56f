//! Aggregate identity resolution and ordered routing.

pub mod identity;
pub mod router;

pub use identity::{IdentityResolver, IdentitySource, ResolvedIdentity, SubjectHint};
pub use router::{AggregateRouter, MessageRouter, RoutingDecision};
