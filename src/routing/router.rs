//! Routing decisions derived from aggregate identity.
//!
//! Messages that share an aggregate identity must be processed in order, so
//! they are pinned to the same lane; messages without one may go anywhere.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::identity::IdentityResolver;
use crate::messaging::InboundMessage;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Process in order with every other message carrying `key`
    Ordered { key: String },
    /// No ordering constraint
    Unordered,
}

impl RoutingDecision {
    pub fn from_identity(identity: Option<String>) -> Self {
        match identity {
            Some(key) => Self::Ordered { key },
            None => Self::Unordered,
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Ordered { .. })
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Ordered { key } => Some(key),
            Self::Unordered => None,
        }
    }

    /// Lane for an ordered decision, stable across processes for a given key.
    ///
    /// Returns `None` for unordered decisions or when `lane_count` is zero.
    pub fn lane(&self, lane_count: usize) -> Option<usize> {
        match (self, lane_count) {
            (_, 0) | (Self::Unordered, _) => None,
            (Self::Ordered { key }, count) => Some((fnv1a(key.as_bytes()) % count as u64) as usize),
        }
    }
}

/// 64-bit FNV-1a
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Decides how an inbound message should be dispatched
pub trait MessageRouter: Send + Sync {
    fn route(&self, message: &InboundMessage) -> RoutingDecision;
}

/// Routes by resolved aggregate identity
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateRouter {
    resolver: IdentityResolver,
}

impl AggregateRouter {
    pub fn new(resolver: IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl MessageRouter for AggregateRouter {
    fn route(&self, message: &InboundMessage) -> RoutingDecision {
        let resolved = self.resolver.resolve_message(message);
        if let Some(resolved) = &resolved {
            trace!(
                topic = %message.topic,
                aggregate_id = %resolved.aggregate_id,
                source = %resolved.source,
                "Resolved aggregate identity"
            );
        }
        RoutingDecision::from_identity(resolved.map(|r| r.aggregate_id))
    }
}
