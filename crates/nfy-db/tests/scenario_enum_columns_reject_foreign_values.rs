//! Scenario: the `type` / `severity` columns only hold wire tokens.
//!
//! # Invariants under test
//!
//! 1. CHECK constraints reject tokens outside the closed sets, including the
//!    absent spellings `unknown` and `none` (SQLSTATE 23514).
//! 2. Decoding a non-text column into a closed enum fails with a type error.
//! 3. Decoding an unrecognized text value fails; it never falls back to a
//!    default member.
//!
//! DB-backed test, skipped if NFY_DATABASE_URL is not set.

use nfy_event::{Severity, Type};
use sqlx::Row;
use uuid::Uuid;

fn is_check_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        db_err.code().as_deref() == Some("23514")
    } else {
        false
    }
}

#[tokio::test]
async fn foreign_values_are_rejected() -> anyhow::Result<()> {
    let url = match std::env::var(nfy_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: NFY_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;
    nfy_db::migrate(&pool).await?;

    // -----------------------------------------------------------------------
    // 1. CHECK constraints
    // -----------------------------------------------------------------------

    for (ty, sev) in [("unknown", "ok"), ("State", "ok"), ("state", "none"), ("state", "critical")] {
        let err = sqlx::query(
            "insert into source_events (event_id, occurred_at, name, type, severity) \
             values ($1, now(), 'web-01', $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(ty)
        .bind(sev)
        .execute(&pool)
        .await
        .unwrap_err();
        assert!(is_check_violation(&err), "{ty}/{sev}: {err}");
    }

    // -----------------------------------------------------------------------
    // 2. Non-text column
    // -----------------------------------------------------------------------

    let row = sqlx::query("select 4::int4 as severity").fetch_one(&pool).await?;
    assert!(row.try_get::<Severity, _>("severity").is_err());

    // -----------------------------------------------------------------------
    // 3. Unrecognized text, and the absent spellings
    // -----------------------------------------------------------------------

    let row = sqlx::query("select 'critical'::text as severity, 'none'::text as s2, 'unknown'::text as ty")
        .fetch_one(&pool)
        .await?;
    assert!(row.try_get::<Severity, _>("severity").is_err());
    assert!(row.try_get::<Severity, _>("s2").is_err());
    assert!(row.try_get::<Type, _>("ty").is_err());

    let row = sqlx::query("select null::text as severity, 'incident-age'::text as ty")
        .fetch_one(&pool)
        .await?;
    assert_eq!(row.try_get::<Severity, _>("severity")?, Severity::None);
    assert_eq!(row.try_get::<Type, _>("ty")?, Type::IncidentAge);

    Ok(())
}

#[tokio::test]
async fn migrate_is_idempotent_and_status_sees_table() -> anyhow::Result<()> {
    let url = match std::env::var(nfy_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: NFY_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;

    nfy_db::migrate(&pool).await?;
    nfy_db::migrate(&pool).await?;

    let st = nfy_db::status(&pool).await?;
    assert!(st.ok);
    assert!(st.has_source_events_table);
    Ok(())
}
