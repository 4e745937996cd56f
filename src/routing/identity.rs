//! # Aggregate Identity Resolution
//!
//! Extracts the per-entity ordering key from an inbound message by walking a
//! fixed priority chain:
//!
//! 1. a valid [`Envelope`]'s `aggregate_id`
//! 2. the aggregate-id headers, in [`AGGREGATE_ID_HEADERS`] order
//! 3. the transport key
//! 4. an explicit subject hint, scanned right to left by `.` segment
//!
//! Every candidate must satisfy the identity grammar. A message with no usable
//! candidate simply has no identity; that is not an error.

use std::collections::HashMap;
use std::fmt;

use crate::constants::AGGREGATE_ID_HEADERS;
use crate::messaging::{Envelope, InboundMessage};
use crate::validation::normalized_aggregate_id;

/// Whether a subject may be mined for an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectHint<'a> {
    /// Subject fallback disabled
    #[default]
    None,
    /// Dot-separated subject to scan, e.g. `orders.created.order-42`
    Explicit(&'a str),
}

impl<'a> SubjectHint<'a> {
    pub fn from_option(subject: Option<&'a str>) -> Self {
        subject.map_or(Self::None, Self::Explicit)
    }
}

/// Where a resolved identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Envelope,
    Header(&'static str),
    TransportKey,
    Subject,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope => f.write_str("envelope"),
            Self::Header(name) => write!(f, "header:{name}"),
            Self::TransportKey => f.write_str("transport_key"),
            Self::Subject => f.write_str("subject"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub aggregate_id: String,
    pub source: IdentitySource,
}

/// Stateless resolver; safe to share and call from any task
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the aggregate identity, or `None` when nothing usable is present
    pub fn resolve(
        &self,
        payload: &[u8],
        headers: &HashMap<String, String>,
        transport_key: &[u8],
        subject: SubjectHint<'_>,
    ) -> Option<String> {
        self.resolve_with_source(payload, headers, transport_key, subject)
            .map(|resolved| resolved.aggregate_id)
    }

    /// Like [`resolve`](Self::resolve), also reporting which step matched
    pub fn resolve_with_source(
        &self,
        payload: &[u8],
        headers: &HashMap<String, String>,
        transport_key: &[u8],
        subject: SubjectHint<'_>,
    ) -> Option<ResolvedIdentity> {
        if let Some(id) = from_envelope(payload) {
            return Some(ResolvedIdentity {
                aggregate_id: id,
                source: IdentitySource::Envelope,
            });
        }

        for name in AGGREGATE_ID_HEADERS {
            if let Some(id) = headers.get(name).and_then(|v| normalized_aggregate_id(v)) {
                return Some(ResolvedIdentity {
                    aggregate_id: id.to_string(),
                    source: IdentitySource::Header(name),
                });
            }
        }

        if let Some(id) = std::str::from_utf8(transport_key)
            .ok()
            .and_then(normalized_aggregate_id)
        {
            return Some(ResolvedIdentity {
                aggregate_id: id.to_string(),
                source: IdentitySource::TransportKey,
            });
        }

        if let SubjectHint::Explicit(subject) = subject {
            if let Some(id) = subject.rsplit('.').find_map(normalized_aggregate_id) {
                return Some(ResolvedIdentity {
                    aggregate_id: id.to_string(),
                    source: IdentitySource::Subject,
                });
            }
        }

        None
    }

    /// Resolve using every field of a delivered message
    pub fn resolve_message(&self, message: &InboundMessage) -> Option<ResolvedIdentity> {
        self.resolve_with_source(
            &message.payload,
            &message.headers,
            message.key_bytes(),
            SubjectHint::from_option(message.subject.as_deref()),
        )
    }
}

fn from_envelope(payload: &[u8]) -> Option<String> {
    // Cheap rejection before attempting a full decode; JSON may lead with whitespace
    let first = payload.iter().find(|b| !b.is_ascii_whitespace());
    if first != Some(&b'{') {
        return None;
    }
    Envelope::from_bytes(payload)
        .ok()
        .map(|envelope| envelope.aggregate_id.trim().to_string())
}
