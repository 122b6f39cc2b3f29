//! The remote store
//!
//! Canonical state for users, events, stories, comments, genres and images.
//! Everything is normalized into redb tables; the fetch operations assemble
//! the denormalized wire records the handlers return.

mod event_ops;
mod story_ops;
mod tables;
mod user_ops;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{io, result};

use musicbee_core::id::GenreId;
use musicbee_util_error::BoxedError;
use redb_bincode::{ReadTransaction, ReadableTable as _, WriteTransaction};
use snafu::{Location, ResultExt as _, Snafu};
use tokio::task::JoinError;
use tracing::{debug, info};

pub use self::event_ops::EventWriteOutcome;
pub use self::story_ops::StoryCreateOutcome;
pub use self::tables::*;
pub use self::user_ops::ProfileUpdateOutcome;

const LOG_TARGET: &str = "musicbee::store";

#[derive(Debug, Snafu)]
pub enum StoreError {
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
    #[snafu(display("Store written by a newer version: {db_ver} > {code_ver}"))]
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
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of a write op that checks existence and ownership
///
/// Keeps the store free of HTTP concerns; the handlers map these onto
/// status codes.
#[derive(Debug)]
pub enum WriteOutcome<T> {
    Done(T),
    NotFound,
    Denied,
}

/// The genre catalog
///
/// Static reference data; missing entries are inserted at every open, so
/// extending the list is just extending this const.
const GENRE_SEED: &[(&str, &str)] = &[
    ("ambient", "Ambient"),
    ("drum-and-bass", "Drum & Bass"),
    ("house", "House"),
    ("hip-hop", "Hip-Hop"),
    ("indie", "Indie"),
    ("jazz", "Jazz"),
    ("metal", "Metal"),
    ("pop", "Pop"),
    ("rock", "Rock"),
    ("techno", "Techno"),
];

#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<redb_bincode::Database>,
}

impl Store {
    pub async fn mk_db_path(data_dir: &Path) -> result::Result<PathBuf, io::Error> {
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(data_dir.join("musicbee.redb"))
    }

    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Store> {
        let path = path.into();
        debug!(target: LOG_TARGET, path = %path.display(), "Opening store");
        let inner = tokio::task::spawn_blocking(move || redb_bincode::Database::create(path))
            .await
            .context(JoinSnafu)?
            .context(DatabaseSnafu)?;

        Self::write_with_inner(&inner, |tx| {
            Self::init_tables_tx(tx)?;
            Self::handle_db_ver_migrations(tx)?;
            Self::seed_genres_tx(tx)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Shared handle to the raw database, for the session store.
    pub fn raw_db(&self) -> Arc<redb_bincode::Database> {
        self.inner.clone()
    }

    fn init_tables_tx(tx: &WriteTransaction) -> StoreResult<()> {
        tx.open_table(&db_version::TABLE)?;

        tx.open_table(&users::TABLE)?;
        tx.open_table(&user_follows::TABLE)?;
        tx.open_table(&user_followers::TABLE)?;

        tx.open_table(&genres::TABLE)?;

        tx.open_table(&events::TABLE)?;
        tx.open_table(&events_by_time::TABLE)?;
        tx.open_table(&event_rsvps::TABLE)?;
        tx.open_table(&event_comments::TABLE)?;

        tx.open_table(&stories::TABLE)?;
        tx.open_table(&stories_by_time::TABLE)?;
        tx.open_table(&stories_by_owner::TABLE)?;
        tx.open_table(&stories_by_event::TABLE)?;
        tx.open_table(&story_likes::TABLE)?;
        tx.open_table(&story_comments::TABLE)?;

        tx.open_table(&images::TABLE)?;
        Ok(())
    }

    fn handle_db_ver_migrations(tx: &WriteTransaction) -> StoreResult<()> {
        const DB_VER: u64 = 0;

        let mut table_db_ver = tx.open_table(&db_version::TABLE)?;

        let Some(cur_db_ver) = table_db_ver.first()?.map(|g| g.1.value()) else {
            info!(target: LOG_TARGET, "Initializing new store");
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

        Ok(())
    }

    fn seed_genres_tx(tx: &WriteTransaction) -> StoreResult<()> {
        let mut genres_table = tx.open_table(&genres::TABLE)?;

        for (id, name) in GENRE_SEED {
            let id: GenreId = id.parse().expect("Seed slugs are valid");
            if genres_table.get(&id)?.is_none() {
                genres_table.insert(
                    &id,
                    &GenreRecord {
                        name: (*name).to_owned(),
                    },
                )?;
            }
        }
        Ok(())
    }
}

impl Store {
    pub async fn write_with_inner<T>(
        inner: &redb_bincode::Database,
        f: impl FnOnce(&'_ WriteTransaction) -> StoreResult<T>,
    ) -> StoreResult<T> {
        tokio::task::block_in_place(|| {
            let dbtx = inner.begin_write().context(TransactionSnafu)?;
            let res = f(&dbtx)?;

            dbtx.commit().context(CommitSnafu)?;

            Ok(res)
        })
    }

    pub async fn write_with<T>(
        &self,
        f: impl FnOnce(&'_ WriteTransaction) -> StoreResult<T>,
    ) -> StoreResult<T> {
        Self::write_with_inner(&self.inner, f).await
    }

    pub async fn read_with<T>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> StoreResult<T>,
    ) -> StoreResult<T> {
        tokio::task::block_in_place(|| {
            let dbtx = self.inner.begin_read().context(TransactionSnafu)?;

            f(&dbtx)
        })
    }
}

impl Store {
    pub async fn all_genres(&self) -> StoreResult<Vec<musicbee_core::entity::Genre>> {
        self.read_with(|tx| {
            let genres_table = tx.open_table(&genres::TABLE)?;
            genres_table
                .range(..)?
                .map(|res| {
                    let (k, v) = res?;
                    Ok(musicbee_core::entity::Genre {
                        id: k.value(),
                        name: v.value().name,
                    })
                })
                .collect()
        })
        .await
    }

    pub async fn put_image(&self, mime: String, data: Vec<u8>) -> StoreResult<musicbee_core::ImageId> {
        self.write_with(move |tx| {
            let mut images_table = tx.open_table(&images::TABLE)?;
            let id = musicbee_core::ImageId::generate();
            images_table.insert(&id, &ImageRecord { mime, data })?;
            Ok(id)
        })
        .await
    }

    pub async fn get_image(
        &self,
        id: musicbee_core::ImageId,
    ) -> StoreResult<Option<ImageRecord>> {
        self.read_with(|tx| {
            let images_table = tx.open_table(&images::TABLE)?;
            Ok(images_table.get(&id)?.map(|g| g.value()))
        })
        .await
    }

    /// Dump the keys of a table as json, for the `dev db-dump` command.
    pub async fn dump_table(&self, name: &str) -> StoreResult<serde_json::Value> {
        fn keys_of<K, V>(
            tx: &ReadTransaction,
            table: &redb_bincode::TableDefinition<'_, K, V>,
        ) -> StoreResult<serde_json::Value>
        where
            K: bincode::Encode + bincode::Decode<()> + std::fmt::Display,
            V: bincode::Encode + bincode::Decode<()>,
        {
            Ok(serde_json::Value::Array(
                tx.open_table(table)?
                    .range(..)?
                    .map(|res| Ok(serde_json::Value::String(res?.0.value().to_string())))
                    .collect::<StoreResult<Vec<_>>>()?,
            ))
        }

        let name = name.to_owned();
        self.read_with(move |tx| match name.as_str() {
            "users" => keys_of(tx, &users::TABLE),
            "genres" => keys_of(tx, &genres::TABLE),
            "events" => keys_of(tx, &events::TABLE),
            "stories" => keys_of(tx, &stories::TABLE),
            "images" => keys_of(tx, &images::TABLE),
            other => Err(StoreError::from(Box::from(format!(
                "unknown table: {other}"
            )) as BoxedError)),
        })
        .await
    }
}

#[cfg(test)]
mod tests;
