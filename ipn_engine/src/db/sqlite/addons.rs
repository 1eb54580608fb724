use log::*;
use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{Addon, NewAddon},
};

const ADDON_COLUMNS: &str = "id, name, support_email, enable_thankyou, thankyou_note, notify_reversals";

pub async fn insert_addon(addon: NewAddon, conn: &mut SqliteConnection) -> Result<Addon, SqliteDatabaseError> {
    let sql = format!(
        "INSERT INTO addons (name, support_email, enable_thankyou, thankyou_note, notify_reversals) VALUES ($1, $2, \
         $3, $4, $5) RETURNING {ADDON_COLUMNS}"
    );
    let addon = sqlx::query_as::<_, Addon>(&sql)
        .bind(addon.name)
        .bind(addon.support_email)
        .bind(addon.enable_thankyou)
        .bind(addon.thankyou_note)
        .bind(addon.notify_reversals)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Addon #{} '{}' saved", addon.id, addon.name);
    Ok(addon)
}

pub async fn fetch_addon(id: i64, conn: &mut SqliteConnection) -> Result<Option<Addon>, SqliteDatabaseError> {
    let sql = format!("SELECT {ADDON_COLUMNS} FROM addons WHERE id = $1");
    let addon = sqlx::query_as::<_, Addon>(&sql).bind(id).fetch_optional(conn).await?;
    Ok(addon)
}
