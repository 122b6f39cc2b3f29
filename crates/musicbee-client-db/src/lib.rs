//! The local mirror
//!
//! A lossy, possibly-stale cache of entities the viewer has successfully
//! fetched, used for rendering when the remote store is unreachable. The
//! remote store stays the sole source of truth: `put` overwrites
//! unconditionally and the last committed transaction wins, with no merge
//! and no conflict detection.

mod tables;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{io, result};

use musicbee_core::id::{GenreId, Username};
use musicbee_core::{EventId, StoryId};
use musicbee_util_error::BoxedError;
use redb_bincode::{ReadTransaction, ReadableTable, WriteTransaction};
use snafu::{Location, ResultExt as _, Snafu};
use tokio::task::JoinError;
use tracing::{debug, info};

pub use self::tables::*;

const LOG_TARGET: &str = "musicbee::mirror";

#[derive(Debug, Snafu)]
pub enum MirrorError {
    Database {
        source: redb::DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        location: Location,
    },
    Transaction {
        source: redb::TransactionError,
        #[snafu(implicit)]
        location: Location,
    },
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Mirror written by a newer version: {db_ver} > {code_ver}"))]
    DbVersionTooHigh {
        db_ver: u64,
        code_ver: u64,
        #[snafu(implicit)]
        location: Location,
    },
    Join {
        source: JoinError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    TxLogic {
        source: BoxedError,
        #[snafu(implicit)]
        location: Location,
    },
}
pub type MirrorResult<T> = std::result::Result<T, MirrorError>;

/// Handle to the mirror database
///
/// Opened once per session and shared; all concurrent views read and write
/// through the same handle, with redb transactions as the only
/// serialization.
#[derive(Debug)]
pub struct Mirror {
    inner: Arc<redb_bincode::Database>,
}

impl Mirror {
    pub async fn mk_db_path(data_dir: &Path) -> result::Result<PathBuf, io::Error> {
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(data_dir.join("mirror.redb"))
    }

    pub async fn open(path: impl Into<PathBuf>) -> MirrorResult<Mirror> {
        let path = path.into();
        debug!(target: LOG_TARGET, path = %path.display(), "Opening mirror");
        let inner = tokio::task::spawn_blocking(move || redb_bincode::Database::create(path))
            .await
            .context(JoinSnafu)?
            .context(DatabaseSnafu)?;

        Self::write_with_inner(&inner, |tx| {
            Self::init_tables_tx(tx)?;
            Self::handle_db_ver_migrations(tx)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Shared handle to the raw database, for co-located stores like the
    /// viewer's sessions.
    pub fn raw_db(&self) -> Arc<redb_bincode::Database> {
        self.inner.clone()
    }

    /// Create all object stores and indexes
    ///
    /// Opening a table that already exists is a no-op, which is what makes
    /// re-running this on every open safe.
    fn init_tables_tx(tx: &WriteTransaction) -> MirrorResult<()> {
        tx.open_table(&db_version::TABLE)?;

        tx.open_table(&user_store::TABLE)?;
        tx.open_table(&event_store::TABLE)?;
        tx.open_table(&story_store::TABLE)?;
        tx.open_table(&genre_store::TABLE)?;

        tx.open_table(&event_by_organiser::TABLE)?;
        tx.open_table(&story_by_owner::TABLE)?;
        tx.open_table(&story_by_event::TABLE)?;
        Ok(())
    }

    fn handle_db_ver_migrations(tx: &WriteTransaction) -> MirrorResult<()> {
        const DB_VER: u64 = 1;

        let mut table_db_ver = tx.open_table(&db_version::TABLE)?;

        let Some(mut cur_db_ver) = table_db_ver.first()?.map(|g| g.1.value()) else {
            info!(target: LOG_TARGET, "Initializing new mirror");
            table_db_ver.insert(&(), &DB_VER)?;

            return Ok(());
        };

        if DB_VER < cur_db_ver {
            return DbVersionTooHighSnafu {
                db_ver: cur_db_ver,
                code_ver: DB_VER,
            }
            .fail();
        }

        while cur_db_ver < DB_VER {
            debug!(target: LOG_TARGET, db_ver = %cur_db_ver, "Running migration");
            match cur_db_ver {
                0 => Self::migrate_v0(tx)?,
                DB_VER => { /* ensures we didn't forget to increment DB_VER */ }
                x => panic!("Unexpected mirror schema ver: {x}"),
            }

            cur_db_ver += 1;
        }

        table_db_ver.insert(&(), &cur_db_ver)?;
        debug!(target: LOG_TARGET, db_ver = cur_db_ver, "Mirror schema version");

        Ok(())
    }

    /// v0 mirrors predate the `story_by_event` index; backfill it.
    fn migrate_v0(tx: &WriteTransaction) -> MirrorResult<()> {
        let story_table = tx.open_table(&story_store::TABLE)?;
        let mut by_event_table = tx.open_table(&story_by_event::TABLE)?;

        for record in story_table.range(..)? {
            let (_, v) = record?;
            let story = v.value();
            if let Some(event) = story.event {
                by_event_table.insert(&(event, story.id), &())?;
            }
        }
        Ok(())
    }
}

impl Mirror {
    pub async fn write_with_inner<T>(
        inner: &redb_bincode::Database,
        f: impl FnOnce(&'_ WriteTransaction) -> MirrorResult<T>,
    ) -> MirrorResult<T> {
        tokio::task::block_in_place(|| {
            let dbtx = inner.begin_write().context(TransactionSnafu)?;
            let res = f(&dbtx)?;

            dbtx.commit().context(CommitSnafu)?;

            Ok(res)
        })
    }

    pub async fn write_with<T>(
        &self,
        f: impl FnOnce(&'_ WriteTransaction) -> MirrorResult<T>,
    ) -> MirrorResult<T> {
        Self::write_with_inner(&self.inner, f).await
    }

    pub async fn read_with<T>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> MirrorResult<T>,
    ) -> MirrorResult<T> {
        tokio::task::block_in_place(|| {
            let dbtx = self.inner.begin_read().context(TransactionSnafu)?;

            f(&dbtx)
        })
    }
}

impl Mirror {
    pub async fn put_user(&self, record: UserMirrorRecord) -> MirrorResult<()> {
        self.write_with(|tx| {
            let mut user_table = tx.open_table(&user_store::TABLE)?;
            user_table.insert(&record.username, &record)?;
            Ok(())
        })
        .await
    }

    pub async fn get_user(&self, username: &Username) -> MirrorResult<Option<UserMirrorRecord>> {
        let username = username.clone();
        self.read_with(|tx| {
            let user_table = tx.open_table(&user_store::TABLE)?;
            Ok(user_table.get(&username)?.map(|g| g.value()))
        })
        .await
    }

    pub async fn put_event(&self, record: EventMirrorRecord) -> MirrorResult<()> {
        self.write_with(|tx| {
            let mut event_table = tx.open_table(&event_store::TABLE)?;
            let mut by_organiser_table = tx.open_table(&event_by_organiser::TABLE)?;

            // An overwrite can move the record under the index; drop the
            // stale entry before writing the new one.
            if let Some(prev) = event_table.get(&record.id)?.map(|g| g.value()) {
                if prev.organiser != record.organiser {
                    by_organiser_table.remove(&(prev.organiser, prev.id))?;
                }
            }

            by_organiser_table.insert(&(record.organiser.clone(), record.id), &())?;
            event_table.insert(&record.id, &record)?;
            Ok(())
        })
        .await
    }

    pub async fn get_event(&self, id: EventId) -> MirrorResult<Option<EventMirrorRecord>> {
        self.read_with(|tx| {
            let event_table = tx.open_table(&event_store::TABLE)?;
            Ok(event_table.get(&id)?.map(|g| g.value()))
        })
        .await
    }

    pub async fn all_events(&self) -> MirrorResult<Vec<EventMirrorRecord>> {
        self.read_with(|tx| {
            let event_table = tx.open_table(&event_store::TABLE)?;
            event_table
                .range(..)?
                .map(|res| Ok(res?.1.value()))
                .collect()
        })
        .await
    }

    pub async fn events_by_organiser(
        &self,
        organiser: &Username,
    ) -> MirrorResult<Vec<EventMirrorRecord>> {
        let organiser = organiser.clone();
        self.read_with(|tx| {
            let event_table = tx.open_table(&event_store::TABLE)?;
            let by_organiser_table = tx.open_table(&event_by_organiser::TABLE)?;

            let mut ret = vec![];
            for record in by_organiser_table
                .range((organiser.clone(), EventId::ZERO)..=(organiser.clone(), EventId::MAX))?
            {
                let (k, _) = record?;
                let (_, event_id) = k.value();
                if let Some(event) = event_table.get(&event_id)?.map(|g| g.value()) {
                    ret.push(event);
                }
            }
            Ok(ret)
        })
        .await
    }

    /// First match through the non-unique organiser index
    ///
    /// Duplicate index values are a real ambiguity here; callers that care
    /// about all of them use [`Self::events_by_organiser`].
    pub async fn first_event_by_organiser(
        &self,
        organiser: &Username,
    ) -> MirrorResult<Option<EventMirrorRecord>> {
        Ok(self.events_by_organiser(organiser).await?.into_iter().next())
    }

    pub async fn delete_event(&self, id: EventId) -> MirrorResult<()> {
        self.write_with(|tx| {
            let mut event_table = tx.open_table(&event_store::TABLE)?;
            let mut by_organiser_table = tx.open_table(&event_by_organiser::TABLE)?;

            if let Some(prev) = event_table.remove(&id)?.map(|g| g.value()) {
                by_organiser_table.remove(&(prev.organiser, prev.id))?;
            }
            Ok(())
        })
        .await
    }

    pub async fn put_story(&self, record: StoryMirrorRecord) -> MirrorResult<()> {
        self.write_with(|tx| {
            let mut story_table = tx.open_table(&story_store::TABLE)?;
            let mut by_owner_table = tx.open_table(&story_by_owner::TABLE)?;
            let mut by_event_table = tx.open_table(&story_by_event::TABLE)?;

            if let Some(prev) = story_table.get(&record.id)?.map(|g| g.value()) {
                if prev.owner != record.owner {
                    by_owner_table.remove(&(prev.owner, prev.id))?;
                }
                if prev.event != record.event {
                    if let Some(prev_event) = prev.event {
                        by_event_table.remove(&(prev_event, prev.id))?;
                    }
                }
            }

            by_owner_table.insert(&(record.owner.clone(), record.id), &())?;
            if let Some(event) = record.event {
                by_event_table.insert(&(event, record.id), &())?;
            }
            story_table.insert(&record.id, &record)?;
            Ok(())
        })
        .await
    }

    pub async fn get_story(&self, id: StoryId) -> MirrorResult<Option<StoryMirrorRecord>> {
        self.read_with(|tx| {
            let story_table = tx.open_table(&story_store::TABLE)?;
            Ok(story_table.get(&id)?.map(|g| g.value()))
        })
        .await
    }

    pub async fn all_stories(&self) -> MirrorResult<Vec<StoryMirrorRecord>> {
        self.read_with(|tx| {
            let story_table = tx.open_table(&story_store::TABLE)?;
            story_table
                .range(..)?
                .map(|res| Ok(res?.1.value()))
                .collect()
        })
        .await
    }

    pub async fn stories_by_owner(&self, owner: &Username) -> MirrorResult<Vec<StoryMirrorRecord>> {
        let owner = owner.clone();
        self.read_with(|tx| {
            let story_table = tx.open_table(&story_store::TABLE)?;
            let by_owner_table = tx.open_table(&story_by_owner::TABLE)?;

            let mut ret = vec![];
            for record in by_owner_table
                .range((owner.clone(), StoryId::ZERO)..=(owner.clone(), StoryId::MAX))?
            {
                let (k, _) = record?;
                let (_, story_id) = k.value();
                if let Some(story) = story_table.get(&story_id)?.map(|g| g.value()) {
                    ret.push(story);
                }
            }
            Ok(ret)
        })
        .await
    }

    pub async fn stories_by_event(&self, event: EventId) -> MirrorResult<Vec<StoryMirrorRecord>> {
        self.read_with(|tx| {
            let story_table = tx.open_table(&story_store::TABLE)?;
            let by_event_table = tx.open_table(&story_by_event::TABLE)?;

            let mut ret = vec![];
            for record in
                by_event_table.range((event, StoryId::ZERO)..=(event, StoryId::MAX))?
            {
                let (k, _) = record?;
                let (_, story_id) = k.value();
                if let Some(story) = story_table.get(&story_id)?.map(|g| g.value()) {
                    ret.push(story);
                }
            }
            Ok(ret)
        })
        .await
    }

    pub async fn delete_story(&self, id: StoryId) -> MirrorResult<()> {
        self.write_with(|tx| {
            let mut story_table = tx.open_table(&story_store::TABLE)?;
            let mut by_owner_table = tx.open_table(&story_by_owner::TABLE)?;
            let mut by_event_table = tx.open_table(&story_by_event::TABLE)?;

            if let Some(prev) = story_table.remove(&id)?.map(|g| g.value()) {
                by_owner_table.remove(&(prev.owner, prev.id))?;
                if let Some(event) = prev.event {
                    by_event_table.remove(&(event, prev.id))?;
                }
            }
            Ok(())
        })
        .await
    }

    pub async fn put_genre(&self, record: GenreMirrorRecord) -> MirrorResult<()> {
        self.write_with(|tx| {
            let mut genre_table = tx.open_table(&genre_store::TABLE)?;
            genre_table.insert(&record.id, &record)?;
            Ok(())
        })
        .await
    }

    pub async fn get_genre(&self, id: &GenreId) -> MirrorResult<Option<GenreMirrorRecord>> {
        let id = id.clone();
        self.read_with(|tx| {
            let genre_table = tx.open_table(&genre_store::TABLE)?;
            Ok(genre_table.get(&id)?.map(|g| g.value()))
        })
        .await
    }

    pub async fn all_genres(&self) -> MirrorResult<Vec<GenreMirrorRecord>> {
        self.read_with(|tx| {
            let genre_table = tx.open_table(&genre_store::TABLE)?;
            genre_table
                .range(..)?
                .map(|res| Ok(res?.1.value()))
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests;
