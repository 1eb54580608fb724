use std::str::FromStr;

use chrono::Utc;
use log::*;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db::{
        sqlite::SqliteDatabaseError,
        traits::{PurchaseCompletionResult, ReversalResult},
    },
    db_types::{Contribution, ContributionKind, NewContribution, NewReversal, PurchaseCompletion},
};
use ipn_common::Money;

const CONTRIBUTION_COLUMNS: &str = "id, tracking_ref, transaction_ref, addon_id, user_id, amount, currency, kind, \
                                    related_id, post_data, processed_at, created_at, updated_at";

impl<'r> FromRow<'r, SqliteRow> for Contribution {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let amount: String = row.try_get("amount")?;
        let amount = Decimal::from_str(&amount)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "amount".to_string(), source: Box::new(e) })?;
        let currency: String = row.try_get("currency")?;
        Ok(Self {
            id: row.try_get("id")?,
            tracking_ref: row.try_get("tracking_ref")?,
            transaction_ref: row.try_get("transaction_ref")?,
            addon_id: row.try_get("addon_id")?,
            user_id: row.try_get("user_id")?,
            amount: Money::new(amount, currency),
            kind: row.try_get("kind")?,
            related_id: row.try_get("related_id")?,
            post_data: row.try_get("post_data")?,
            processed_at: row.try_get("processed_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts a new contribution using the given connection. This is not atomic on its own. Embed the call in a
/// transaction if it is one of several writes, and pass `&mut *tx` as the connection argument.
///
/// `RETURNING` rows are always drained with `fetch_all` in this module. A statement that is left half-stepped keeps
/// its write pending, so the commit would not include it.
pub async fn insert_contribution(
    contribution: NewContribution,
    conn: &mut SqliteConnection,
) -> Result<Contribution, SqliteDatabaseError> {
    let sql = format!(
        "INSERT INTO contributions (tracking_ref, transaction_ref, addon_id, user_id, amount, currency, kind) VALUES \
         ($1, $2, $3, $4, $5, $6, $7) RETURNING {CONTRIBUTION_COLUMNS}"
    );
    let record = sqlx::query_as::<_, Contribution>(&sql)
        .bind(contribution.tracking_ref)
        .bind(contribution.transaction_ref)
        .bind(contribution.addon_id)
        .bind(contribution.user_id)
        .bind(contribution.amount.amount().to_string())
        .bind(contribution.amount.currency())
        .bind(contribution.kind)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ {} #{} saved with amount {}", record.kind, record.id, record.amount);
    Ok(record)
}

pub async fn fetch_contribution(id: i64, conn: &mut SqliteConnection) -> Result<Option<Contribution>, SqliteDatabaseError> {
    let sql = format!("SELECT {CONTRIBUTION_COLUMNS} FROM contributions WHERE id = $1");
    let record = sqlx::query_as::<_, Contribution>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(record)
}

pub async fn fetch_purchase_by_tracking_ref(
    tracking_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Contribution>, SqliteDatabaseError> {
    let sql = format!("SELECT {CONTRIBUTION_COLUMNS} FROM contributions WHERE tracking_ref = $1 AND kind = 'Purchase'");
    let record = sqlx::query_as::<_, Contribution>(&sql).bind(tracking_ref).fetch_optional(conn).await?;
    Ok(record)
}

/// Returns the earliest purchase with the given transaction reference
pub async fn fetch_purchase_by_transaction_ref(
    transaction_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Contribution>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {CONTRIBUTION_COLUMNS} FROM contributions WHERE transaction_ref = $1 AND kind = 'Purchase' ORDER BY id \
         LIMIT 1"
    );
    let record = sqlx::query_as::<_, Contribution>(&sql).bind(transaction_ref).fetch_optional(conn).await?;
    Ok(record)
}

pub async fn fetch_reversals(
    purchase_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Contribution>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {CONTRIBUTION_COLUMNS} FROM contributions WHERE related_id = $1 AND kind IN ('Refund', 'Chargeback') \
         ORDER BY id"
    );
    let records = sqlx::query_as::<_, Contribution>(&sql).bind(purchase_id).fetch_all(conn).await?;
    Ok(records)
}

pub async fn fetch_by_kind(
    kind: ContributionKind,
    conn: &mut SqliteConnection,
) -> Result<Vec<Contribution>, SqliteDatabaseError> {
    let sql = format!("SELECT {CONTRIBUTION_COLUMNS} FROM contributions WHERE kind = $1 ORDER BY id");
    let records = sqlx::query_as::<_, Contribution>(&sql).bind(kind).fetch_all(conn).await?;
    Ok(records)
}

/// Completes the pending purchase for `tracking_ref`.
///
/// The update only matches unprocessed purchases, so of two concurrent deliveries only one can win. The loser (and
/// any later redelivery) sees the purchase as already processed.
pub async fn complete_purchase(
    tracking_ref: &str,
    completion: PurchaseCompletion,
    conn: &mut SqliteConnection,
) -> Result<PurchaseCompletionResult, SqliteDatabaseError> {
    let sql = format!(
        "UPDATE contributions SET processed_at = $1, transaction_ref = $2, post_data = $3, amount = COALESCE($4, \
         amount), currency = COALESCE($5, currency) WHERE tracking_ref = $6 AND kind = 'Purchase' AND processed_at IS \
         NULL RETURNING {CONTRIBUTION_COLUMNS}"
    );
    let (amount, currency) = match &completion.amount {
        Some(m) => (Some(m.amount().to_string()), Some(m.currency().to_string())),
        None => (None, None),
    };
    let updated = sqlx::query_as::<_, Contribution>(&sql)
        .bind(Utc::now())
        .bind(completion.transaction_ref)
        .bind(completion.post_data)
        .bind(amount)
        .bind(currency)
        .bind(tracking_ref)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .next();
    if let Some(purchase) = updated {
        debug!("🗃️ Purchase #{} [{tracking_ref}] marked as processed", purchase.id);
        return Ok(PurchaseCompletionResult::Completed(purchase));
    }
    let result = match fetch_purchase_by_tracking_ref(tracking_ref, conn).await? {
        Some(purchase) => {
            trace!("🗃️ Purchase #{} [{tracking_ref}] was already processed", purchase.id);
            PurchaseCompletionResult::AlreadyProcessed(purchase)
        },
        None => PurchaseCompletionResult::NotFound,
    };
    Ok(result)
}

/// Links a refund or chargeback to its original purchase.
///
/// The insert is a no-op when the purchase already has a linked reversal (see the `contributions_single_reversal`
/// index), which makes the check-and-create a single atomic statement.
pub async fn record_reversal(
    reversal: NewReversal,
    conn: &mut SqliteConnection,
) -> Result<ReversalResult, SqliteDatabaseError> {
    if !reversal.kind.is_reversal() {
        return Err(SqliteDatabaseError::NotAReversal(reversal.kind));
    }
    let original = match fetch_purchase_by_transaction_ref(&reversal.transaction_ref, &mut *conn).await? {
        Some(o) => o,
        None => return Ok(ReversalResult::OriginalNotFound),
    };
    let sql = format!(
        "INSERT INTO contributions (tracking_ref, addon_id, user_id, amount, currency, kind, related_id, post_data, \
         processed_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT DO NOTHING RETURNING \
         {CONTRIBUTION_COLUMNS}"
    );
    let inserted = sqlx::query_as::<_, Contribution>(&sql)
        .bind(reversal.tracking_ref)
        .bind(original.addon_id)
        .bind(original.user_id)
        .bind(reversal.amount.amount().to_string())
        .bind(reversal.amount.currency())
        .bind(reversal.kind)
        .bind(original.id)
        .bind(reversal.post_data)
        .bind(Utc::now())
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    let result = match inserted {
        Some(record) => {
            debug!("🗃️ {} #{} of {} linked to purchase #{}", record.kind, record.id, record.amount, original.id);
            ReversalResult::Recorded { reversal: record, original }
        },
        None => {
            trace!("🗃️ Purchase #{} already has a linked refund or chargeback", original.id);
            ReversalResult::AlreadyProcessed(original)
        },
    };
    Ok(result)
}

pub async fn insert_subscription_event(
    tracking_ref: Option<&str>,
    post_data: &str,
    conn: &mut SqliteConnection,
) -> Result<Contribution, SqliteDatabaseError> {
    let sql = format!(
        "INSERT INTO contributions (tracking_ref, amount, currency, kind, post_data, processed_at) VALUES ($1, $2, $3, \
         $4, $5, $6) RETURNING {CONTRIBUTION_COLUMNS}"
    );
    let empty = Money::default();
    let record = sqlx::query_as::<_, Contribution>(&sql)
        .bind(tracking_ref)
        .bind(empty.amount().to_string())
        .bind(empty.currency())
        .bind(ContributionKind::SubscriptionEvent)
        .bind(post_data)
        .bind(Utc::now())
        .fetch_all(conn)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Subscription event #{} saved", record.id);
    Ok(record)
}
