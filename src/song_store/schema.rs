//! SQLite schema for the song library.
//!
//! Version 0 kept the group name inline on every song. Version 1 moved groups
//! into their own table referenced by `songs.group_id`.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
};
use anyhow::Result;
use rusqlite::Connection;

const SONGS_TABLE_V0: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("group_name", &SqlType::Text, non_null = true),
        sqlite_column!("release_date", &SqlType::Text, non_null = true), // YYYY-MM-DD
        sqlite_column!("song_text", &SqlType::Text, non_null = true),
        sqlite_column!("link", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_songs_group_name", "group_name")],
};

const GROUPS_TABLE: Table = Table {
    name: "groups",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true, is_unique = true),
    ],
    indices: &[],
};

const SONGS_TABLE_V1: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "group_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "groups",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Restrict,
            })
        ),
        sqlite_column!("release_date", &SqlType::Text, non_null = true), // YYYY-MM-DD
        sqlite_column!("song_text", &SqlType::Text, non_null = true),
        sqlite_column!("link", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_songs_group_id", "group_id"),
        ("idx_songs_title", "title"),
    ],
};

/// Moves inline group names into the `groups` table, keeping song ids.
fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
    GROUPS_TABLE.create(conn)?;
    conn.execute(
        "INSERT INTO groups (name) SELECT DISTINCT group_name FROM songs ORDER BY group_name",
        [],
    )?;

    conn.execute("ALTER TABLE songs RENAME TO songs_v0", [])?;
    conn.execute("DROP INDEX IF EXISTS idx_songs_group_name", [])?;
    SONGS_TABLE_V1.create(conn)?;
    conn.execute(
        "INSERT INTO songs (id, title, group_id, release_date, song_text, link) \
         SELECT o.id, o.title, g.id, o.release_date, o.song_text, o.link \
         FROM songs_v0 o JOIN groups g ON g.name = o.group_name",
        [],
    )?;
    // Carry the AUTOINCREMENT counter over so ids of deleted songs stay retired.
    conn.execute("DELETE FROM sqlite_sequence WHERE name = 'songs'", [])?;
    conn.execute(
        "INSERT INTO sqlite_sequence (name, seq) SELECT 'songs', seq FROM sqlite_sequence WHERE name = 'songs_v0'",
        [],
    )?;
    conn.execute("DROP TABLE songs_v0", [])?;
    Ok(())
}

pub const SONG_LIBRARY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[SONGS_TABLE_V0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[GROUPS_TABLE, SONGS_TABLE_V1],
        migration: Some(migrate_v0_to_v1),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_persistence::{migrate_to_latest, read_schema_version};

    #[test]
    fn latest_schema_validates_after_create() {
        let conn = Connection::open_in_memory().unwrap();
        let latest = SONG_LIBRARY_VERSIONED_SCHEMAS.last().unwrap();
        latest.create(&conn).unwrap();
        latest.validate(&conn).unwrap();
    }

    #[test]
    fn v0_database_is_migrated_without_losing_songs() {
        let mut conn = Connection::open_in_memory().unwrap();
        SONG_LIBRARY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO songs (title, group_name, release_date, song_text, link) VALUES
                ('Uprising', 'Muse', '2009-09-07', 'a', 'l1'),
                ('Starlight', 'Muse', '2006-09-04', 'b', 'l2'),
                ('Creep', 'Radiohead', '1992-09-21', 'c', 'l3');
             DELETE FROM songs WHERE title = 'Starlight';",
        )
        .unwrap();

        let version = migrate_to_latest(&mut conn, SONG_LIBRARY_VERSIONED_SCHEMAS).unwrap();
        assert_eq!(version, 1);
        assert_eq!(read_schema_version(&conn).unwrap(), Some(1));
        SONG_LIBRARY_VERSIONED_SCHEMAS[1].validate(&conn).unwrap();

        let rows: Vec<(i64, String, String)> = conn
            .prepare(
                "SELECT s.id, s.title, g.name FROM songs s JOIN groups g ON g.id = s.group_id ORDER BY s.id",
            )
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![
                (1, "Uprising".to_string(), "Muse".to_string()),
                (3, "Creep".to_string(), "Radiohead".to_string()),
            ]
        );

        let groups: i64 = conn
            .query_row("SELECT COUNT(*) FROM groups", [], |r| r.get(0))
            .unwrap();
        assert_eq!(groups, 2);
    }

    #[test]
    fn migration_keeps_deleted_ids_retired() {
        let mut conn = Connection::open_in_memory().unwrap();
        SONG_LIBRARY_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO songs (title, group_name, release_date, song_text, link) VALUES
                ('Uprising', 'Muse', '2009-09-07', 'a', 'l1'),
                ('Starlight', 'Muse', '2006-09-04', 'b', 'l2');
             DELETE FROM songs WHERE title = 'Starlight';",
        )
        .unwrap();

        migrate_to_latest(&mut conn, SONG_LIBRARY_VERSIONED_SCHEMAS).unwrap();
        conn.execute(
            "INSERT INTO songs (title, group_id, release_date, song_text, link) VALUES ('New', 1, '2020-01-01', '', '')",
            [],
        )
        .unwrap();
        assert_eq!(conn.last_insert_rowid(), 3);
    }
}
