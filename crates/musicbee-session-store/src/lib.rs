//! Redb-backed session store for tower-sessions
//!
//! Sessions live in the same redb database as the rest of the server state,
//! so signed-in users survive a server restart.

use std::sync::Arc;

use async_trait::async_trait;
use bincode::{Decode, Encode};
use redb_bincode::TableDefinition;
use snafu::{ResultExt as _, Snafu};
use time::OffsetDateTime;
use tower_sessions_core::session::{Id, Record};
use tower_sessions_core::session_store::{self, SessionStore};

/// What we persist per session
///
/// `Record` itself is not bincode-encodable (its expiry is an
/// `OffsetDateTime`), so the data map goes through JSON and the expiry is
/// kept as a unix timestamp.
#[derive(Debug, Clone, Encode, Decode)]
struct SessionRecord {
    data: Vec<u8>,
    expires_unix: i64,
}

impl SessionRecord {
    fn from_record(record: &Record) -> session_store::Result<Self> {
        let data = serde_json::to_vec(&record.data)
            .map_err(|e| session_store::Error::Backend(e.to_string()))?;
        Ok(Self {
            data,
            expires_unix: record.expiry_date.unix_timestamp(),
        })
    }

    fn into_record(self, id: Id) -> session_store::Result<Record> {
        let data = serde_json::from_slice(&self.data)
            .map_err(|e| session_store::Error::Backend(e.to_string()))?;
        let expiry_date = OffsetDateTime::from_unix_timestamp(self.expires_unix)
            .map_err(|e| session_store::Error::Backend(e.to_string()))?;
        Ok(Record {
            id,
            data,
            expiry_date,
        })
    }

    fn is_expired(&self) -> bool {
        self.expires_unix < OffsetDateTime::now_utc().unix_timestamp()
    }
}

const SESSIONS_TABLE: TableDefinition<i128, SessionRecord> =
    TableDefinition::new("musicbee_sessions");

#[derive(Debug, Snafu)]
pub enum SessionStoreInitError {
    Database { source: redb::DatabaseError },
    Transaction { source: redb::TransactionError },
    Table { source: redb::TableError },
    Commit { source: redb::CommitError },
}

/// tower-sessions store persisting into a shared redb database handle
#[derive(Debug, Clone)]
pub struct MusicbeeSessionStore {
    db: Arc<redb_bincode::Database>,
}

impl MusicbeeSessionStore {
    /// Create the store, ensuring the sessions table exists.
    ///
    /// Performs blocking I/O; call during startup.
    pub fn new(db: Arc<redb_bincode::Database>) -> Result<Self, SessionStoreInitError> {
        {
            let write_txn = db.begin_write().context(TransactionSnafu)?;
            write_txn.open_table(&SESSIONS_TABLE).context(TableSnafu)?;
            write_txn.commit().context(CommitSnafu)?;
        }

        Ok(Self { db })
    }
}

fn backend_err(e: impl std::fmt::Display) -> session_store::Error {
    session_store::Error::Backend(e.to_string())
}

#[async_trait]
impl SessionStore for MusicbeeSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.save(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let stored = SessionRecord::from_record(record)?;
        let id = record.id.0;

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(backend_err)?;
            {
                let mut table = write_txn.open_table(&SESSIONS_TABLE).map_err(backend_err)?;
                table.insert(&id, &stored).map_err(backend_err)?;
            }
            write_txn.commit().map_err(backend_err)?;
            Ok(())
        })
        .await
        .map_err(backend_err)?
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let id = session_id.0;
        let session_id = *session_id;

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read().map_err(backend_err)?;
            let table = read_txn.open_table(&SESSIONS_TABLE).map_err(backend_err)?;

            let Some(stored) = table.get(&id).map_err(backend_err)?.map(|g| g.value()) else {
                return Ok(None);
            };

            if stored.is_expired() {
                return Ok(None);
            }

            stored.into_record(session_id).map(Some)
        })
        .await
        .map_err(backend_err)?
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let id = session_id.0;

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(backend_err)?;
            {
                let mut table = write_txn.open_table(&SESSIONS_TABLE).map_err(backend_err)?;
                table.remove(&id).map_err(backend_err)?;
            }
            write_txn.commit().map_err(backend_err)?;
            Ok(())
        })
        .await
        .map_err(backend_err)?
    }
}
