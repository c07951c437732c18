//! SQLite-backed song store.

use super::models::{NewSong, Song, SongFilter, STORED_DATE_FORMAT};
use super::query::{build_filter_query, SELECT_SONGS};
use super::schema::SONG_LIBRARY_VERSIONED_SCHEMAS;
use super::trait_def::{SongStore, SongStoreError, SongStoreResult};
use crate::sqlite_persistence::migrate_to_latest;
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Song store over a single SQLite file.
///
/// Writes go through one connection; reads are spread round-robin over a
/// small pool of read-only connections, which WAL mode lets run alongside
/// the writer.
#[derive(Clone)]
pub struct SqliteSongStore {
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Vec<Arc<Mutex<Connection>>>,
    read_index: Arc<AtomicUsize>,
}

fn lock(conn: &Mutex<Connection>) -> SongStoreResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| SongStoreError::Database(anyhow!("database connection mutex poisoned")))
}

fn row_to_song(row: &Row) -> rusqlite::Result<Song> {
    let raw_date: String = row.get(3)?;
    let release_date = NaiveDate::parse_from_str(&raw_date, STORED_DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        group: row.get(2)?,
        release_date,
        text: row.get(4)?,
        link: row.get(5)?,
    })
}

impl SqliteSongStore {
    /// Opens (creating if needed) the database at `db_path` and migrates it
    /// to the latest schema.
    ///
    /// `busy_timeout` bounds how long any single statement waits on a lock
    /// held by another connection.
    pub fn new<P: AsRef<Path>>(
        db_path: P,
        read_pool_size: usize,
        busy_timeout: Duration,
    ) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open song database {:?}", db_path))?;
        write_conn.busy_timeout(busy_timeout)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        let version = migrate_to_latest(&mut write_conn, SONG_LIBRARY_VERSIONED_SCHEMAS)?;
        SONG_LIBRARY_VERSIONED_SCHEMAS[version]
            .validate(&write_conn)
            .context("Song database schema validation failed")?;

        let song_count: i64 = write_conn.query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))?;
        info!(
            "Opened song library at {:?}: schema version {}, {} songs",
            db_path, version, song_count
        );

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.busy_timeout(busy_timeout)?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteSongStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    /// Returns the id of the group called `name`, inserting it on first use.
    fn get_or_create_group(conn: &Connection, name: &str) -> rusqlite::Result<i64> {
        let existing = conn
            .query_row(
                "SELECT id FROM groups WHERE name = ?1",
                params![name],
                |r| r.get(0),
            )
            .optional()?;
        match existing {
            Some(id) => Ok(id),
            None => {
                conn.execute("INSERT INTO groups (name) VALUES (?1)", params![name])?;
                debug!("Created group '{}'", name);
                Ok(conn.last_insert_rowid())
            }
        }
    }

    /// Drops a group once no song references it anymore.
    fn prune_group(conn: &Connection, group_id: i64) -> rusqlite::Result<()> {
        conn.execute(
            "DELETE FROM groups WHERE id = ?1 AND NOT EXISTS (SELECT 1 FROM songs WHERE group_id = ?1)",
            params![group_id],
        )?;
        Ok(())
    }
}

impl SongStore for SqliteSongStore {
    fn find(&self, filter: &SongFilter) -> SongStoreResult<Vec<Song>> {
        let query = build_filter_query(filter)?;
        debug!("Filter query: {} {:?}", query.sql, query.params);

        let conn = self.get_read_conn();
        let conn = lock(&conn)?;
        let mut stmt = conn.prepare_cached(&query.sql)?;
        let songs = stmt
            .query_map(params_from_iter(query.params.iter()), row_to_song)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(songs)
    }

    fn find_by_id(&self, id: i64) -> SongStoreResult<Song> {
        let conn = self.get_read_conn();
        let conn = lock(&conn)?;
        conn.query_row(
            &format!("{} WHERE s.id = ?1", SELECT_SONGS),
            params![id],
            row_to_song,
        )
        .optional()?
        .ok_or(SongStoreError::NotFound(id))
    }

    fn insert(&self, song: &NewSong) -> SongStoreResult<i64> {
        let mut conn = lock(&self.write_conn)?;
        let tx = conn.transaction()?;
        let group_id = Self::get_or_create_group(&tx, &song.group)?;
        tx.execute(
            "INSERT INTO songs (title, group_id, release_date, song_text, link) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                song.title,
                group_id,
                song.release_date.format(STORED_DATE_FORMAT).to_string(),
                song.text,
                song.link,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn update(&self, song: &Song) -> SongStoreResult<()> {
        let mut conn = lock(&self.write_conn)?;
        let tx = conn.transaction()?;

        let previous_group_id: i64 = tx
            .query_row(
                "SELECT group_id FROM songs WHERE id = ?1",
                params![song.id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or(SongStoreError::NotFound(song.id))?;

        let group_id = Self::get_or_create_group(&tx, &song.group)?;
        tx.execute(
            "UPDATE songs SET title = ?1, group_id = ?2, release_date = ?3, song_text = ?4, link = ?5 WHERE id = ?6",
            params![
                song.title,
                group_id,
                song.release_date.format(STORED_DATE_FORMAT).to_string(),
                song.text,
                song.link,
                song.id,
            ],
        )?;
        if previous_group_id != group_id {
            Self::prune_group(&tx, previous_group_id)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, id: i64) -> SongStoreResult<()> {
        let mut conn = lock(&self.write_conn)?;
        let tx = conn.transaction()?;
        let group_id: i64 = tx
            .query_row(
                "DELETE FROM songs WHERE id = ?1 RETURNING group_id",
                params![id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or(SongStoreError::NotFound(id))?;
        Self::prune_group(&tx, group_id)?;
        tx.commit()?;
        Ok(())
    }

    fn count(&self) -> SongStoreResult<usize> {
        let conn = self.get_read_conn();
        let conn = lock(&conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}
