//! Database operations for the `citations` table.

use brandpulse_core::{Citation, CitationFilter, CitationOrder, NewCitation};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::scores::{to_decimal, to_f64};
use crate::DbError;

/// A row from the `citations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CitationRow {
    pub id: Uuid,
    pub mention_id: Uuid,
    pub source: String,
    pub text: String,
    pub authority_score: Decimal,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl From<CitationRow> for Citation {
    fn from(row: CitationRow) -> Self {
        Citation {
            id: row.id,
            mention_id: row.mention_id,
            source: row.source,
            text: row.text,
            authority_score: to_f64(row.authority_score),
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

const CITATION_COLUMNS: &str = "id, mention_id, source, text, authority_score, metadata, created_at";

fn order_clause(order: CitationOrder) -> &'static str {
    match order {
        CitationOrder::AuthorityDesc => "ORDER BY authority_score DESC, created_at DESC",
        CitationOrder::NewestFirst => "ORDER BY created_at DESC, authority_score DESC",
    }
}

/// Insert a citation and return the stored row, or `None` when its mention
/// is missing or soft-deleted.
///
/// # Errors
///
/// Returns [`DbError::InvalidScore`] for a non-finite authority, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn insert_citation(
    pool: &PgPool,
    citation: &NewCitation,
) -> Result<Option<CitationRow>, DbError> {
    // FOR SHARE waits out a concurrent soft delete and re-checks `deleted_at`,
    // so a citation never lands on a deleted mention.
    let row = sqlx::query_as::<_, CitationRow>(&format!(
        "INSERT INTO citations (id, mention_id, source, text, authority_score, metadata) \
         SELECT $1, m.id, $3, $4, $5, $6 FROM mentions m \
         WHERE m.id = $2 AND m.deleted_at IS NULL \
         FOR SHARE \
         RETURNING {CITATION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(citation.mention_id)
    .bind(&citation.source)
    .bind(&citation.text)
    .bind(to_decimal(citation.authority_score)?)
    .bind(&citation.metadata)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List citations matching `filter` in the requested order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_citations(
    pool: &PgPool,
    filter: &CitationFilter,
    order: CitationOrder,
    limit: i64,
) -> Result<Vec<CitationRow>, DbError> {
    let order_by = order_clause(order);
    let rows = match filter {
        CitationFilter::All => {
            sqlx::query_as::<_, CitationRow>(&format!(
                "SELECT {CITATION_COLUMNS} FROM citations {order_by} LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        CitationFilter::Mention(id) => {
            sqlx::query_as::<_, CitationRow>(&format!(
                "SELECT {CITATION_COLUMNS} FROM citations \
                 WHERE mention_id = $1 {order_by} LIMIT $2"
            ))
            .bind(id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        CitationFilter::Mentions(ids) => {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            sqlx::query_as::<_, CitationRow>(&format!(
                "SELECT {CITATION_COLUMNS} FROM citations \
                 WHERE mention_id = ANY($1) {order_by} LIMIT $2"
            ))
            .bind(ids.as_slice())
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
