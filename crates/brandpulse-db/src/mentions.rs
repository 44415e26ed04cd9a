//! Database operations for the `mentions` table.

use brandpulse_core::{Mention, NewMention, TrendPoint};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::scores::{to_decimal, to_f64};
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `mentions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MentionRow {
    pub id: Uuid,
    pub brand_id: String,
    pub content: String,
    pub sentiment_score: Decimal,
    pub magnitude: Decimal,
    pub context_metadata: Value,
    pub mentioned_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<MentionRow> for Mention {
    fn from(row: MentionRow) -> Self {
        Mention {
            id: row.id,
            brand_id: row.brand_id,
            content: row.content,
            sentiment_score: to_f64(row.sentiment_score),
            magnitude: to_f64(row.magnitude),
            context_metadata: row.context_metadata,
            mentioned_at: row.mentioned_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TrendRow {
    day: NaiveDate,
    average_sentiment: f64,
}

const MENTION_COLUMNS: &str = "id, brand_id, content, sentiment_score, magnitude, \
     context_metadata, mentioned_at, deleted_at, created_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a mention with a freshly generated id and return the stored row.
///
/// # Errors
///
/// Returns [`DbError::InvalidScore`] for non-finite scores, or [`DbError::Sqlx`]
/// if the insert fails.
pub async fn insert_mention(pool: &PgPool, mention: &NewMention) -> Result<MentionRow, DbError> {
    let row = sqlx::query_as::<_, MentionRow>(&format!(
        "INSERT INTO mentions \
             (id, brand_id, content, sentiment_score, magnitude, context_metadata, mentioned_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {MENTION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&mention.brand_id)
    .bind(&mention.content)
    .bind(to_decimal(mention.sentiment_score)?)
    .bind(to_decimal(mention.magnitude)?)
    .bind(&mention.context_metadata)
    .bind(mention.mentioned_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a live (not soft-deleted) mention by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_mention(pool: &PgPool, id: Uuid) -> Result<Option<MentionRow>, DbError> {
    let row = sqlx::query_as::<_, MentionRow>(&format!(
        "SELECT {MENTION_COLUMNS} FROM mentions WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List live mentions for a brand, newest first, optionally bounded to a window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_mentions_by_brand(
    pool: &PgPool,
    brand_id: &str,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    limit: i64,
) -> Result<Vec<MentionRow>, DbError> {
    let rows = match window {
        Some((start, end)) => {
            sqlx::query_as::<_, MentionRow>(&format!(
                "SELECT {MENTION_COLUMNS} FROM mentions \
                 WHERE brand_id = $1 AND deleted_at IS NULL \
                   AND mentioned_at >= $2 AND mentioned_at <= $3 \
                 ORDER BY mentioned_at DESC, created_at DESC \
                 LIMIT $4"
            ))
            .bind(brand_id)
            .bind(start)
            .bind(end)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, MentionRow>(&format!(
                "SELECT {MENTION_COLUMNS} FROM mentions \
                 WHERE brand_id = $1 AND deleted_at IS NULL \
                 ORDER BY mentioned_at DESC, created_at DESC \
                 LIMIT $2"
            ))
            .bind(brand_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}

/// Mean sentiment per UTC day for a brand's live mentions in `[start, end]`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sentiment_trend(
    pool: &PgPool,
    brand_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<TrendPoint>, DbError> {
    let rows = sqlx::query_as::<_, TrendRow>(
        "SELECT (date_trunc('day', mentioned_at AT TIME ZONE 'UTC'))::date AS day, \
                AVG(sentiment_score)::float8 AS average_sentiment \
         FROM mentions \
         WHERE brand_id = $1 AND deleted_at IS NULL \
           AND mentioned_at >= $2 AND mentioned_at <= $3 \
         GROUP BY day \
         ORDER BY day",
    )
    .bind(brand_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| TrendPoint {
            date: r.day,
            average_sentiment: r.average_sentiment,
        })
        .collect())
}

/// Soft-delete a mention and hard-delete its citations in one transaction.
///
/// Returns `false` if no live mention had that id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn soft_delete_mention(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE mentions SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query("DELETE FROM citations WHERE mention_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}
