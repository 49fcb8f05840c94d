//! Domain layer of the telemetry streaming backend.
//!
//! Holds the stream-ticket authority (issuing and resolving short-lived
//! capability tokens), the collaborator interfaces it depends on (the
//! ephemeral ticket store and the device registry), and the error tree the
//! `web` layer translates into HTTP responses.

pub mod device;
pub mod error;
pub mod gateway;
pub mod ticket;
pub mod ticket_store;
pub mod timestamp;

pub use ticket::{Credentials, IssuedTicket, Purpose, ResolvedIdentity, TicketAuthority};
