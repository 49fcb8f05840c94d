//! Claim shapes for the signed tokens the ticket authority handles.
//!
//! Stream tickets carry a `typ` marker so an ordinary bearer token can never
//! be replayed as a ticket, a `pur` purpose scope, and (in the tracked
//! format) the `tid` store key. Legacy tickets predate `tid`; both decode
//! paths are preserved.

use super::Purpose;
use serde::{Deserialize, Serialize};

/// The `typ` claim value that marks a token as a stream ticket.
pub(crate) const STREAM_TICKET_TYP: &str = "stream-ticket";

/// Claims carried by a signed stream ticket.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StreamTicketClaims {
    pub(crate) sub: String,
    pub(crate) typ: String,
    /// Store key of the ticket record. Absent in the legacy format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tid: Option<String>,
    pub(crate) pur: Purpose,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

/// The claims read from an ordinary bearer token; only the subject matters
/// here, the rest of the bearer's claims belong to the global auth guard.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BearerClaims {
    pub(crate) sub: String,
    pub(crate) exp: i64,
}
