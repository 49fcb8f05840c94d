//! The ephemeral key-value store backing stream-ticket validity.
//!
//! Tickets are written once with a TTL equal to their lifetime and are never
//! deleted on use; a ticket stays resolvable by any holder until the entry
//! expires. The store is an external collaborator in production (a
//! TTL-bearing key-value service); [`InMemoryTicketStore`] is the in-process
//! implementation used for single-node deployments and tests.

use crate::error::Error;
use crate::ticket::Purpose;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// The stored state of an issued ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    pub ticket_id: String,
    pub user_id: String,
    pub purpose: Purpose,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Ephemeral TTL-bearing key-value collaborator keyed by ticket id.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Write a record with a TTL. Overwrites any previous entry for the id.
    async fn put(&self, record: TicketRecord, ttl_seconds: i64) -> Result<(), Error>;

    /// Fetch a record if it exists and has not expired.
    async fn get(&self, ticket_id: &str) -> Result<Option<TicketRecord>, Error>;
}

/// In-process implementation with lazy expiry: entries past their deadline
/// are removed on the read that finds them expired.
pub struct InMemoryTicketStore {
    entries: DashMap<String, StoredEntry>,
}

struct StoredEntry {
    record: TicketRecord,
    expires_at: DateTime<Utc>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for InMemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn put(&self, record: TicketRecord, ttl_seconds: i64) -> Result<(), Error> {
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);
        self.entries
            .insert(record.ticket_id.clone(), StoredEntry { record, expires_at });
        Ok(())
    }

    async fn get(&self, ticket_id: &str) -> Result<Option<TicketRecord>, Error> {
        let expired = match self.entries.get(ticket_id) {
            Some(entry) => {
                if entry.expires_at > Utc::now() {
                    return Ok(Some(entry.record.clone()));
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(ticket_id);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ticket_id: &str) -> TicketRecord {
        TicketRecord {
            ticket_id: ticket_id.to_string(),
            user_id: "user-1".to_string(),
            purpose: Purpose::Data,
            issued_at: Utc::now(),
            expires_at: Utc::now() + Duration::seconds(300),
        }
    }

    #[tokio::test]
    async fn test_put_then_get_returns_record() {
        let store = InMemoryTicketStore::new();
        store.put(record("t-1"), 300).await.unwrap();

        let found = store.get("t-1").await.unwrap().unwrap();
        assert_eq!(found.user_id, "user-1");
        assert_eq!(found.purpose, Purpose::Data);
    }

    #[tokio::test]
    async fn test_get_unknown_id_returns_none() {
        let store = InMemoryTicketStore::new();
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_read() {
        let store = InMemoryTicketStore::new();
        store.put(record("t-2"), -1).await.unwrap();

        assert!(store.get("t-2").await.unwrap().is_none());
        // gone for good, not just filtered
        assert!(store.entries.get("t-2").is_none());
    }

    #[tokio::test]
    async fn test_get_does_not_consume_the_entry() {
        let store = InMemoryTicketStore::new();
        store.put(record("t-3"), 300).await.unwrap();

        assert!(store.get("t-3").await.unwrap().is_some());
        assert!(store.get("t-3").await.unwrap().is_some());
    }
}
