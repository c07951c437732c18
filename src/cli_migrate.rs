use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use song_library_server::song_store::SONG_LIBRARY_VERSIONED_SCHEMAS;
use song_library_server::sqlite_persistence::{migrate_to_latest, read_schema_version};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Brings a song database to the latest schema version.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite song database file.
    #[clap(value_parser = parse_path)]
    pub db_path: PathBuf,

    /// Only validate the current schema and print its version, never write.
    #[clap(long)]
    pub check: bool,
}

fn check(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        bail!("Database file does not exist: {:?}", db_path);
    }
    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;

    let version = read_schema_version(&conn)?
        .ok_or_else(|| anyhow!("Database {:?} has no schema yet", db_path))?;
    let schema = SONG_LIBRARY_VERSIONED_SCHEMAS
        .get(version)
        .ok_or_else(|| anyhow!("Unknown schema version {}", version))?;
    schema.validate(&conn)?;

    let latest = SONG_LIBRARY_VERSIONED_SCHEMAS.len() - 1;
    if version == latest {
        println!("{:?}: schema version {} (up to date)", db_path, version);
    } else {
        println!(
            "{:?}: schema version {} ({} pending migration(s) to version {})",
            db_path,
            version,
            latest - version,
            latest
        );
    }
    Ok(())
}

fn migrate(db_path: &Path) -> Result<()> {
    let mut conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let before = read_schema_version(&conn)?;
    let version = migrate_to_latest(&mut conn, SONG_LIBRARY_VERSIONED_SCHEMAS)?;
    SONG_LIBRARY_VERSIONED_SCHEMAS[version]
        .validate(&conn)
        .context("Schema validation failed after migration")?;

    match before {
        None => info!("Created {:?} at schema version {}", db_path, version),
        Some(v) if v == version => info!("{:?} already at schema version {}", db_path, version),
        Some(v) => info!("Migrated {:?} from version {} to {}", db_path, v, version),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    if cli_args.check {
        check(&cli_args.db_path)
    } else {
        migrate(&cli_args.db_path)
    }
}
