use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "marketing-budget admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty timestamped migration file
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Roll back the last applied migration
    MigrateRollback,
    /// Insert baseline plan types and activity types
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenvy::dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateRollback => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator
                .undo(&pool, 1)
                .await
                .context("no migrations were rolled back")?;
            println!("Rolled back last migration");
        }
        Commands::Seed => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            seed(&pool).await?;
            println!("Baseline lookup data seeded");
        }
    }

    Ok(())
}

fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    // Compact timestamp: sqlx takes the digits before the first underscore
    // as the migration version.
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let filename = format!("{timestamp}_{sanitized}.sql");
    let path = Path::new("migrations").join(filename);

    if path.exists() {
        anyhow::bail!("migration already exists: {}", path.display());
    }

    fs::write(&path, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(path)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Prefer ./migrations when running from the repo root; fall back to the
    // crate-local folder when the CWD differs (containers).
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {display}"))
}

async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    const PLAN_TYPES: [&str; 4] = ["Advertising", "Content Marketing", "Events", "Partnerships"];
    const ACTIVITY_TYPES: [&str; 4] = ["Paid Media", "Sponsorship", "Production", "Travel"];

    let now = chrono::Utc::now();

    for name in PLAN_TYPES {
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM plan_types WHERE name = ? AND deleted_at IS NULL")
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if exists.is_none() {
            sqlx::query(
                "INSERT INTO plan_types (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await?;
        }
    }

    for name in ACTIVITY_TYPES {
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM activity_types WHERE name = ? AND deleted_at IS NULL")
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if exists.is_none() {
            sqlx::query(
                "INSERT INTO activity_types (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}
