use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};

/// Offset added to schema versions before they are written to `PRAGMA user_version`,
/// so that a database created by something else (user_version = 0) is never
/// mistaken for one of ours.
pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = $crate::sqlite_persistence::Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                is_autoincrement: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }

    fn from_sql(declared: &str) -> Option<&'static SqlType> {
        match declared {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Restrict,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Restrict => "RESTRICT",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub is_autoincrement: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<&'static ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    fn create_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut sql = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    sql.push_str(" PRIMARY KEY");
                    if column.is_autoincrement {
                        sql.push_str(" AUTOINCREMENT");
                    }
                }
                if column.non_null {
                    sql.push_str(" NOT NULL");
                }
                if column.is_unique {
                    sql.push_str(" UNIQUE");
                }
                if let Some(default_value) = column.default_value {
                    sql.push_str(&format!(" DEFAULT {}", default_value));
                }
                if let Some(fk) = column.foreign_key {
                    sql.push_str(&format!(
                        " REFERENCES {}({}) ON DELETE {}",
                        fk.foreign_table,
                        fk.foreign_column,
                        fk.on_delete.as_sql()
                    ));
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({});", self.name, columns)
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        struct ActualColumn {
            name: String,
            declared_type: String,
            non_null: bool,
            is_primary_key: bool,
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns = stmt
            .query_map([], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    declared_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if actual_columns.is_empty() {
            bail!("Table {} does not exist", self.name);
        }
        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: {}",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if SqlType::from_sql(&actual.declared_type) != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.declared_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }

        for (index_name, _) in self.indices {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }

        // PRAGMA foreign_key_list: id, seq, table, from, to, on_update, on_delete, match
        let mut fk_stmt = conn.prepare(&format!("PRAGMA foreign_key_list({});", self.name))?;
        let actual_fks = fk_stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for column in self.columns {
            let Some(expected) = column.foreign_key else {
                continue;
            };
            let found = actual_fks.iter().any(|(from, table, to, on_delete)| {
                from == column.name
                    && table == expected.foreign_table
                    && to == expected.foreign_column
                    && on_delete == expected.on_delete.as_sql()
            });
            if !found {
                bail!(
                    "Table {} column {} is missing foreign key: expected REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    expected.foreign_table,
                    expected.foreign_column,
                    expected.on_delete.as_sql()
                );
            }
        }

        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    /// Upgrades a database sitting at `version - 1` to this version.
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", BASE_DB_VERSION + self.version)?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Reads the schema version stored in `PRAGMA user_version`.
///
/// Returns `None` for a database that holds no tables yet.
pub fn read_schema_version(conn: &Connection) -> Result<Option<usize>> {
    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;
    if table_count == 0 {
        return Ok(None);
    }

    let user_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if user_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database user_version {} was not written by this server",
            user_version
        );
    }
    Ok(Some(user_version as usize - BASE_DB_VERSION))
}

/// Brings `conn` up to the last schema in `schemas`.
///
/// A fresh database gets the latest schema directly; an existing one runs every
/// pending migration inside a single transaction. Returns the final version.
pub fn migrate_to_latest(conn: &mut Connection, schemas: &[VersionedSchema]) -> Result<usize> {
    let Some(latest) = schemas.last() else {
        bail!("No schema versions defined");
    };

    let mut current_version = match read_schema_version(conn)? {
        None => {
            latest.create(conn)?;
            return Ok(latest.version);
        }
        Some(v) => v,
    };

    if current_version > latest.version {
        bail!(
            "Database schema version {} is newer than the latest known version {}",
            current_version,
            latest.version
        );
    }
    if current_version == latest.version {
        return Ok(current_version);
    }

    let tx = conn.transaction()?;
    for schema in schemas.iter().skip(current_version + 1) {
        let Some(migration_fn) = schema.migration else {
            bail!("Missing migration to schema version {}", schema.version);
        };
        tracing::info!(
            "Migrating db from version {} to {}",
            current_version,
            schema.version
        );
        migration_fn(&tx)?;
        current_version = schema.version;
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;
    Ok(current_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT_TABLE: Table = Table {
        name: "parent",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!("name", &SqlType::Text, non_null = true),
        ],
        indices: &[("idx_parent_name", "name")],
    };

    const CHILD_TABLE: Table = Table {
        name: "child",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!(
                "parent_id",
                &SqlType::Integer,
                non_null = true,
                foreign_key = Some(&ForeignKey {
                    foreign_table: "parent",
                    foreign_column: "id",
                    on_delete: ForeignKeyOnChange::Cascade,
                })
            ),
        ],
        indices: &[],
    };

    #[test]
    fn created_schema_validates() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = VersionedSchema {
            version: 0,
            tables: &[PARENT_TABLE, CHILD_TABLE],
            migration: None,
        };

        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(0));
    }

    #[test]
    fn validate_detects_missing_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            [],
        )
        .unwrap();

        let err = PARENT_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing index"));
        assert!(err.contains("idx_parent_name"));
    }

    #[test]
    fn validate_detects_wrong_on_delete_action() {
        let conn = Connection::open_in_memory().unwrap();
        PARENT_TABLE.create(&conn).unwrap();
        conn.execute(
            "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id) ON DELETE RESTRICT)",
            [],
        )
        .unwrap();

        let err = CHILD_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("missing foreign key"));
    }

    #[test]
    fn validate_detects_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = CHILD_TABLE.validate(&conn).unwrap_err().to_string();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn empty_database_has_no_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn foreign_database_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE something (id INTEGER)", []).unwrap();
        assert!(read_schema_version(&conn).is_err());
    }

    #[test]
    fn migrate_runs_pending_migrations() {
        fn add_child(conn: &Connection) -> Result<()> {
            CHILD_TABLE.create(conn)
        }

        let schemas = [
            VersionedSchema {
                version: 0,
                tables: &[PARENT_TABLE],
                migration: None,
            },
            VersionedSchema {
                version: 1,
                tables: &[PARENT_TABLE, CHILD_TABLE],
                migration: Some(add_child),
            },
        ];

        let mut conn = Connection::open_in_memory().unwrap();
        schemas[0].create(&conn).unwrap();

        let version = migrate_to_latest(&mut conn, &schemas).unwrap();
        assert_eq!(version, 1);
        assert_eq!(read_schema_version(&conn).unwrap(), Some(1));
        schemas[1].validate(&conn).unwrap();

        // Running again is a no-op.
        assert_eq!(migrate_to_latest(&mut conn, &schemas).unwrap(), 1);
    }
}
