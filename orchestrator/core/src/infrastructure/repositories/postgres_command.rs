// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Command Record Repository
//!
//! Production `CommandRecordRepository` backed by the `command_records`
//! table via `sqlx`. Writes are upserts on the fingerprint primary key so
//! concurrent writers for the same command resolve to last-write-wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::command::CommandRecord;
use crate::domain::fingerprint::Fingerprint;
use crate::domain::repository::{CommandRecordRepository, RepositoryError};

pub struct PostgresCommandRecordRepository {
    pool: PgPool,
}

impl PostgresCommandRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `command_records` table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS command_records (
                fingerprint     TEXT PRIMARY KEY,
                tool_name       TEXT NOT NULL,
                normalized_args JSONB NOT NULL,
                output          TEXT NOT NULL,
                created_at      TIMESTAMPTZ NOT NULL,
                expires_at      TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create command_records: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS command_records_created_at_idx ON command_records (created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_record(row: &PgRow) -> Result<CommandRecord, RepositoryError> {
        let fingerprint: String = row.try_get("fingerprint")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let expires_at: Option<DateTime<Utc>> = row.try_get("expires_at")?;

        Ok(CommandRecord {
            fingerprint: Fingerprint::from_raw(fingerprint),
            tool_name: row.try_get("tool_name")?,
            normalized_args: row.try_get("normalized_args")?,
            output: row.try_get("output")?,
            created_at,
            expires_at,
        })
    }
}

#[async_trait]
impl CommandRecordRepository for PostgresCommandRecordRepository {
    async fn save(&self, record: &CommandRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO command_records (
                fingerprint, tool_name, normalized_args, output, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (fingerprint) DO UPDATE SET
                tool_name = EXCLUDED.tool_name,
                normalized_args = EXCLUDED.normalized_args,
                output = EXCLUDED.output,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(record.fingerprint.as_str())
        .bind(&record.tool_name)
        .bind(&record.normalized_args)
        .bind(&record.output)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save command record: {}", e)))?;

        Ok(())
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CommandRecord>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT fingerprint, tool_name, normalized_args, output, created_at, expires_at
            FROM command_records
            WHERE fingerprint = $1
            "#,
        )
        .bind(fingerprint.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM command_records WHERE fingerprint = $1")
            .bind(fingerprint.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<CommandRecord>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT fingerprint, tool_name, normalized_args, output, created_at, expires_at
            FROM command_records
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }
}
