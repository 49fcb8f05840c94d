//! The stream-ticket authority.
//!
//! Stream tickets are short-lived, purpose-scoped capability tokens used to
//! authenticate transports that cannot carry ordinary bearer headers (the
//! browser `EventSource` API being the main one). A ticket is a signed JWT
//! whose validity additionally requires a live record in the ephemeral
//! ticket store; the record expires with the ticket's TTL and is never
//! deleted on use, so a ticket stays reusable by any holder until expiry.

use crate::error::{AuthErrorKind, Error};
use crate::ticket_store::{TicketRecord, TicketStore};
use crate::timestamp;
use chrono::{Duration, Utc};
use claims::{BearerClaims, StreamTicketClaims, STREAM_TICKET_TYP};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub(crate) mod claims;

/// What a credential is allowed to stream.
///
/// `Any` matches both stream purposes and is what bearer-derived identities
/// resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Alerts,
    Data,
    Any,
}

impl Purpose {
    pub fn allows(&self, required: Purpose) -> bool {
        *self == Purpose::Any || *self == required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Alerts => "alerts",
            Purpose::Data => "data",
            Purpose::Any => "any",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decoded ticket contents. The legacy format predates the ticket store and
/// carries no `tid`; it is accepted on signature alone. Do not remove the
/// legacy path without confirming no live tickets still use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTicketPayload {
    Legacy {
        user_id: String,
        purpose: Purpose,
    },
    Tracked {
        ticket_id: String,
        user_id: String,
        purpose: Purpose,
    },
}

/// A freshly issued ticket, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedTicket {
    pub ticket: String,
    pub expires_in_seconds: i64,
    pub ticket_id: String,
}

/// The identity a credential resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user_id: String,
    pub ticket_purpose: Purpose,
}

/// The credentials accompanying a stream request. At most one of `ticket`
/// and `authorization_header` is honored; the ticket wins when both are
/// present.
#[derive(Debug, Default, Clone, Copy)]
pub struct Credentials<'a> {
    pub ticket: Option<&'a str>,
    pub authorization_header: Option<&'a str>,
    pub required_purpose: Option<Purpose>,
}

/// Issues and resolves stream tickets.
pub struct TicketAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    default_ttl_secs: i64,
    min_ttl_secs: i64,
    max_ttl_secs: i64,
    store: Arc<dyn TicketStore>,
}

impl TicketAuthority {
    pub fn new(
        signing_key: &str,
        default_ttl_secs: i64,
        min_ttl_secs: i64,
        max_ttl_secs: i64,
        store: Arc<dyn TicketStore>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.as_bytes()),
            default_ttl_secs,
            min_ttl_secs,
            max_ttl_secs,
            store,
        }
    }

    /// Issue a fresh ticket for `user_id`. The requested TTL is clamped into
    /// the configured window; an absent TTL falls back to the default. The
    /// store record's TTL equals the clamped lifetime.
    pub async fn create_ticket(
        &self,
        user_id: &str,
        ttl_seconds: Option<i64>,
        purpose: Option<Purpose>,
    ) -> Result<IssuedTicket, Error> {
        let ttl_seconds = ttl_seconds
            .unwrap_or(self.default_ttl_secs)
            .clamp(self.min_ttl_secs, self.max_ttl_secs);
        let purpose = purpose.unwrap_or(Purpose::Any);

        let ticket_id = uuid::Uuid::new_v4().to_string();
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::seconds(ttl_seconds);

        let ticket_claims = StreamTicketClaims {
            sub: user_id.to_string(),
            typ: STREAM_TICKET_TYP.to_string(),
            tid: Some(ticket_id.clone()),
            pur: purpose,
            iat: timestamp::epoch_seconds_at(issued_at),
            exp: timestamp::epoch_seconds_at(expires_at),
        };
        let ticket = encode(&Header::default(), &ticket_claims, &self.encoding_key)?;

        self.store
            .put(
                TicketRecord {
                    ticket_id: ticket_id.clone(),
                    user_id: user_id.to_string(),
                    purpose,
                    issued_at,
                    expires_at,
                },
                ttl_seconds,
            )
            .await?;

        debug!("issued {purpose} stream ticket for user {user_id}, ttl {ttl_seconds}s");

        Ok(IssuedTicket {
            ticket,
            expires_in_seconds: ttl_seconds,
            ticket_id,
        })
    }

    /// Resolve the identity behind a stream request's credentials.
    ///
    /// Ticket path: signature and `typ` must verify; a tracked ticket must
    /// also still have its store record, a legacy one is accepted on
    /// signature alone. Bearer path: signature must verify, the resulting
    /// purpose is `any`. No credential at all is `Unauthenticated`.
    pub async fn resolve_identity(
        &self,
        credentials: Credentials<'_>,
    ) -> Result<ResolvedIdentity, Error> {
        if let Some(token) = credentials.ticket {
            return self
                .resolve_ticket(token, credentials.required_purpose)
                .await;
        }
        if let Some(header) = credentials.authorization_header {
            let user_id = self.decode_bearer(header)?;
            return Ok(ResolvedIdentity {
                user_id,
                ticket_purpose: Purpose::Any,
            });
        }
        Err(Error::auth(AuthErrorKind::Unauthenticated))
    }

    async fn resolve_ticket(
        &self,
        token: &str,
        required_purpose: Option<Purpose>,
    ) -> Result<ResolvedIdentity, Error> {
        match self.decode_ticket(token)? {
            StreamTicketPayload::Legacy { user_id, purpose } => {
                check_purpose(purpose, required_purpose)?;
                trace!("accepted legacy stream ticket for user {user_id}");
                Ok(ResolvedIdentity {
                    user_id,
                    ticket_purpose: purpose,
                })
            }
            StreamTicketPayload::Tracked { ticket_id, .. } => {
                let record = self
                    .store
                    .get(&ticket_id)
                    .await?
                    .ok_or_else(|| Error::auth(AuthErrorKind::TicketExpired))?;
                check_purpose(record.purpose, required_purpose)?;
                Ok(ResolvedIdentity {
                    user_id: record.user_id,
                    ticket_purpose: record.purpose,
                })
            }
        }
    }

    /// Verify a ticket's signature and `typ` marker and classify its format.
    pub fn decode_ticket(&self, token: &str) -> Result<StreamTicketPayload, Error> {
        let validation = Validation::new(Algorithm::HS256);
        let decoded = decode::<StreamTicketClaims>(token, &self.decoding_key, &validation)?;
        let ticket_claims = decoded.claims;

        if ticket_claims.typ != STREAM_TICKET_TYP {
            warn!("token presented as stream ticket has typ {:?}", ticket_claims.typ);
            return Err(Error::auth(AuthErrorKind::InvalidCredential));
        }

        Ok(match ticket_claims.tid {
            Some(ticket_id) => StreamTicketPayload::Tracked {
                ticket_id,
                user_id: ticket_claims.sub,
                purpose: ticket_claims.pur,
            },
            None => StreamTicketPayload::Legacy {
                user_id: ticket_claims.sub,
                purpose: ticket_claims.pur,
            },
        })
    }

    /// Extract the subject from a `Bearer` authorization header.
    pub fn decode_bearer(&self, authorization_header: &str) -> Result<String, Error> {
        let token = authorization_header
            .strip_prefix("Bearer ")
            .or_else(|| authorization_header.strip_prefix("bearer "))
            .ok_or_else(|| Error::auth(AuthErrorKind::InvalidCredential))?
            .trim();

        let validation = Validation::new(Algorithm::HS256);
        let decoded = decode::<BearerClaims>(token, &self.decoding_key, &validation)?;
        Ok(decoded.claims.sub)
    }
}

fn check_purpose(offered: Purpose, required: Option<Purpose>) -> Result<(), Error> {
    match required {
        Some(required) if !offered.allows(required) => {
            Err(Error::auth(AuthErrorKind::PurposeMismatch))
        }
        _ => Ok(()),
    }
}
