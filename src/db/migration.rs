//! Forward-only, versioned schema migrations.
//!
//! Every migration is applied at most once. Applied versions are recorded in
//! the `schema_migrations` table, and nothing already there is ever altered
//! or dropped by this module.

use std::collections::HashSet;

use super::{Client, Error};

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// All known migrations, in the order they must be applied.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_tickets",
        sql: include_str!("../../migrations/0001_create_tickets.sql"),
    },
    Migration {
        version: 2,
        name: "create_comments",
        sql: include_str!("../../migrations/0002_create_comments.sql"),
    },
];

/// Key of the advisory lock serializing concurrently starting instances.
const LOCK_KEY: i64 = 0x6865_6c70_6465_736b;

impl Client {
    /// Applies every pending migration in a single transaction.
    ///
    /// Returns the migrations that were applied by this call.
    pub async fn migrate(&mut self) -> Result<Vec<&'static Migration>, Error> {
        let tx = self.0.transaction().await?;

        tx.execute("SELECT pg_advisory_xact_lock($1)", &[&LOCK_KEY])
            .await?;
        tx.batch_execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations ( \
                version    BIGINT      PRIMARY KEY, \
                name       TEXT        NOT NULL, \
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now() \
            )",
        )
        .await?;

        let applied = tx
            .query("SELECT version FROM schema_migrations", &[])
            .await?
            .into_iter()
            .map(|row| row.get::<_, i64>("version"))
            .collect::<HashSet<_>>();

        let mut pending = Vec::new();
        for migration in MIGRATIONS {
            if applied.contains(&migration.version) {
                continue;
            }
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "applying migration",
            );
            tx.batch_execute(migration.sql).await?;
            tx.execute(
                "INSERT INTO schema_migrations (version, name) \
                 VALUES ($1, $2)",
                &[&migration.version, &migration.name],
            )
            .await?;
            pending.push(migration);
        }

        tx.commit().await?;
        Ok(pending)
    }
}
