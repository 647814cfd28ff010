//! nfy-db
//!
//! Postgres record of the events this source submitted.
//!
//! `type` and `severity` are bound and read through the column codec in
//! `nfy-event`; the schema constrains both columns to the wire tokens.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use nfy_event::{Event, Severity, Type};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub const ENV_DB_URL: &str = "NFY_DATABASE_URL";

/// Connect to Postgres using NFY_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_source_events_table: bool,
}

/// Connectivity plus schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='source_events'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_source_events_table: exists,
    })
}

/// A recorded envelope and its bookkeeping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
    pub event: Event,
}

/// Insert one envelope. `event_id` is the caller's key; inserting the same
/// id twice fails on the primary key.
pub async fn insert_event(
    pool: &PgPool,
    event_id: Uuid,
    occurred_at: DateTime<Utc>,
    event: &Event,
) -> Result<()> {
    let tags = serde_json::to_value(&event.tags).context("encode tags")?;
    let rule_ids = serde_json::to_value(&event.rule_ids).context("encode rule_ids")?;

    sqlx::query(
        r#"
        insert into source_events (
          event_id, occurred_at, name, url, tags, type, severity,
          username, message, mute, mute_reason, rules_version, rule_ids
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
        )
        "#,
    )
    .bind(event_id)
    .bind(occurred_at)
    .bind(&event.name)
    .bind(&event.url)
    .bind(tags)
    .bind(event.kind)
    .bind(event.severity)
    .bind(&event.username)
    .bind(&event.message)
    .bind(event.mute)
    .bind(&event.mute_reason)
    .bind(&event.rules_version)
    .bind(rule_ids)
    .execute(pool)
    .await
    .with_context(|| format!("insert_event failed event_id={event_id}"))?;

    Ok(())
}

/// Load one envelope by id. `Ok(None)` if no such row.
pub async fn fetch_event(pool: &PgPool, event_id: Uuid) -> Result<Option<StoredEvent>> {
    let row = sqlx::query(
        r#"
        select event_id, occurred_at, recorded_at, name, url, tags, type, severity,
               username, message, mute, mute_reason, rules_version, rule_ids
        from source_events
        where event_id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("fetch_event failed event_id={event_id}"))?;

    row.map(|r| stored_event_from_row(&r)).transpose()
}

fn stored_event_from_row(row: &PgRow) -> Result<StoredEvent> {
    let event_id: Uuid = row.try_get("event_id")?;

    let tags: serde_json::Value = row.try_get("tags")?;
    let tags: BTreeMap<String, String> = serde_json::from_value(tags)
        .with_context(|| format!("decode tags event_id={event_id}"))?;
    let rule_ids: serde_json::Value = row.try_get("rule_ids")?;
    let rule_ids: BTreeSet<String> = serde_json::from_value(rule_ids)
        .with_context(|| format!("decode rule_ids event_id={event_id}"))?;

    let kind: Type = row
        .try_get("type")
        .with_context(|| format!("decode type event_id={event_id}"))?;
    let severity: Severity = row
        .try_get("severity")
        .with_context(|| format!("decode severity event_id={event_id}"))?;

    Ok(StoredEvent {
        event_id,
        occurred_at: row.try_get("occurred_at")?,
        recorded_at: row.try_get("recorded_at")?,
        event: Event {
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            tags,
            kind,
            severity,
            username: row.try_get("username")?,
            message: row.try_get("message")?,
            mute: row.try_get("mute")?,
            mute_reason: row.try_get("mute_reason")?,
            rules_version: row.try_get("rules_version")?,
            rule_ids,
        },
    })
}
