// Copyright 2024 Meal Planner Authors

use clap::Parser;
use clap::Subcommand;
use meal_planner::{database, query};
use std::path::PathBuf;

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
struct Args {
    /// SQLite database file.
    #[arg(long, env = "MEAL_PLANNER_DATABASE")]
    database: Option<PathBuf>,

    /// Directory product and recipe photos are stored under.
    #[arg(long, env = "MEAL_PLANNER_MEDIA_ROOT")]
    media_root: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the database if needed and apply pending migrations.
    Migrate,
    /// Revert every migration, dropping all tables.
    Revert,
    /// Print the number of rows in each table.
    Summary,
}

/// This is where the database and other user-data lives on-disk. On Linux it should be like:
/// `~/.local/share/meal_planner/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("meal_planner");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()?;

    let database_path = match args.database {
        Some(path) => path,
        None => data_path()?.join("data.sqlite"),
    };
    let media_root = match args.media_root {
        Some(path) => path,
        None => data_path()?.join("media"),
    };
    log::debug!(
        "database at {}, media under {}",
        database_path.display(),
        media_root.display()
    );

    let mut conn = database::establish_connection(&database_path)?;
    match args.commands {
        Commands::Migrate => {
            std::fs::create_dir_all(&media_root)?;
            log::info!("database {} is up to date", database_path.display());
        }
        Commands::Revert => database::revert_all(&mut conn)?,
        Commands::Summary => {
            for (table, count) in query::summary::table_counts(&mut conn)? {
                println!("{table:<26}{count:>8}");
            }
        }
    }
    Ok(())
}
