use async_trait::async_trait;
use bson::{doc, DateTime as BsonDateTime};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::{builtin_migrations, check_ordering, pending_versions};
use crate::error::{PersistError, Result};

pub const SCHEMA_MIGRATIONS: &str = "schema_migrations";

#[async_trait]
pub trait Migration: Send + Sync {
    fn version(&self) -> u32;

    fn name(&self) -> &'static str;

    async fn up(&self, db: &Database) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppliedMigration {
    #[serde(rename = "_id")]
    version: u32,
    name: String,
    applied_at: BsonDateTime,
}

pub struct MigrationRunner {
    db: Database,
    applied: Collection<AppliedMigration>,
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRunner {
    /// Runner over every built-in migration
    pub fn new(db: Database) -> Result<Self> {
        Self::with_migrations(db, builtin_migrations())
    }

    pub fn with_migrations(db: Database, migrations: Vec<Box<dyn Migration>>) -> Result<Self> {
        let versions: Vec<u32> = migrations.iter().map(|m| m.version()).collect();
        check_ordering(&versions)?;
        Ok(Self {
            applied: db.collection(SCHEMA_MIGRATIONS),
            db,
            migrations,
        })
    }

    pub async fn applied_versions(&self) -> Result<Vec<u32>> {
        let applied: Vec<AppliedMigration> = self
            .applied
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(applied.into_iter().map(|m| m.version).collect())
    }

    /// `(version, name)` of every migration not yet applied, in run order
    pub async fn pending(&self) -> Result<Vec<(u32, &'static str)>> {
        let known: Vec<u32> = self.migrations.iter().map(|m| m.version()).collect();
        let pending = pending_versions(&known, &self.applied_versions().await?);
        Ok(self
            .migrations
            .iter()
            .filter(|m| pending.contains(&m.version()))
            .map(|m| (m.version(), m.name()))
            .collect())
    }

    /// Apply pending migrations in order and return the versions applied.
    /// Stops at the first failure; later versions stay pending.
    pub async fn run(&self) -> Result<Vec<u32>> {
        let known: Vec<u32> = self.migrations.iter().map(|m| m.version()).collect();
        let pending = pending_versions(&known, &self.applied_versions().await?);
        if pending.is_empty() {
            tracing::info!("Schema is up to date");
            return Ok(pending);
        }

        let mut done = Vec::with_capacity(pending.len());
        for migration in self.migrations.iter().filter(|m| pending.contains(&m.version())) {
            let version = migration.version();
            tracing::info!(version, name = migration.name(), "Applying migration");

            migration.up(&self.db).await.map_err(|e| PersistError::Migration {
                version,
                message: e.to_string(),
            })?;

            self.applied
                .insert_one(AppliedMigration {
                    version,
                    name: migration.name().to_string(),
                    applied_at: BsonDateTime::now(),
                })
                .await?;
            done.push(version);
        }

        tracing::info!(applied = done.len(), "Migrations complete");
        Ok(done)
    }
}
