//! Repository for institutions and their credentials.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use ledgerlink_core::errors::{Error, Result};
use ledgerlink_core::institutions::{
    ExchangedToken, Institution, InstitutionHealth, InstitutionRepositoryTrait,
    InstitutionSnapshot, InstitutionSummary, LinkCredential,
};
use ledgerlink_core::sync::CursorStatus;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{accounts, institutions, link_credentials, sync_cursors};
use crate::utils::timestamp_to_text;

use super::model::{InstitutionDB, LinkCredentialDB};

pub struct InstitutionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl InstitutionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl InstitutionRepositoryTrait for InstitutionRepository {
    fn get(&self, institution_id: &str) -> Result<Option<Institution>> {
        let mut conn = get_connection(&self.pool)?;

        let row = institutions::table
            .find(institution_id)
            .select(InstitutionDB::as_select())
            .first::<InstitutionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(row.map(Institution::from))
    }

    fn get_by_item_id(&self, item_id: &str) -> Result<Option<Institution>> {
        let mut conn = get_connection(&self.pool)?;

        let row = institutions::table
            .inner_join(link_credentials::table)
            .filter(link_credentials::item_id.eq(item_id))
            .select(InstitutionDB::as_select())
            .first::<InstitutionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(row.map(Institution::from))
    }

    fn list_summaries(&self) -> Result<Vec<InstitutionSummary>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = institutions::table
            .select(InstitutionDB::as_select())
            .order(institutions::name.asc())
            .load::<InstitutionDB>(&mut conn)
            .map_err(StorageError::from)?;

        let cursor_statuses: HashMap<String, String> = sync_cursors::table
            .select((sync_cursors::institution_id, sync_cursors::status))
            .load::<(String, String)>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .collect();

        let account_counts: HashMap<String, i64> = accounts::table
            .group_by(accounts::institution_id)
            .select((accounts::institution_id, count_star()))
            .load::<(String, i64)>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let cursor_status = cursor_statuses
                    .get(&row.id)
                    .and_then(|s| CursorStatus::from_str(s).ok());
                let account_count = account_counts.get(&row.id).copied().unwrap_or(0);
                let institution = Institution::from(row);
                InstitutionSummary {
                    id: institution.id,
                    name: institution.name,
                    health: institution.health,
                    last_refresh_at: institution.last_refresh_at,
                    cursor_status,
                    account_count,
                }
            })
            .collect())
    }

    fn get_credential(&self, institution_id: &str) -> Result<Option<LinkCredential>> {
        let mut conn = get_connection(&self.pool)?;

        let row = link_credentials::table
            .find(institution_id)
            .select(LinkCredentialDB::as_select())
            .first::<LinkCredentialDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(row.map(LinkCredential::from))
    }

    async fn set_health(&self, institution_id: &str, health: InstitutionHealth) -> Result<()> {
        let institution_id = institution_id.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(institutions::table.find(&institution_id))
                    .set((
                        institutions::health.eq(health.as_str()),
                        institutions::updated_at.eq(timestamp_to_text(&Utc::now())),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                if updated == 0 {
                    return Err(Error::NotFound(format!(
                        "Institution {} not found",
                        institution_id
                    )));
                }
                debug!("Institution {} health set to {}", institution_id, health);
                Ok(())
            })
            .await
    }
}

/// Inserts or refreshes an institution inside the caller's transaction.
/// `created_at` is kept from the first insert.
pub(crate) fn upsert_institution(
    conn: &mut SqliteConnection,
    snapshot: &InstitutionSnapshot,
    refreshed_at: &DateTime<Utc>,
) -> Result<()> {
    let row = InstitutionDB::from_snapshot(snapshot, refreshed_at);

    diesel::insert_into(institutions::table)
        .values(&row)
        .on_conflict(institutions::id)
        .do_update()
        .set((
            institutions::name.eq(&row.name),
            institutions::oauth.eq(row.oauth),
            institutions::products.eq(&row.products),
            institutions::health.eq(&row.health),
            institutions::last_refresh_at.eq(&row.last_refresh_at),
            institutions::updated_at.eq(&row.updated_at),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;

    Ok(())
}

/// Item currently linked for an institution, read inside the caller's transaction.
pub(crate) fn stored_item_id(
    conn: &mut SqliteConnection,
    institution_id: &str,
) -> Result<Option<String>> {
    let item_id = link_credentials::table
        .find(institution_id)
        .select(link_credentials::item_id)
        .first::<String>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(item_id)
}

/// Stores the credential for an institution, replacing any previous item.
pub(crate) fn upsert_credential(
    conn: &mut SqliteConnection,
    institution_id: &str,
    token: &ExchangedToken,
) -> Result<()> {
    let row = LinkCredentialDB::new(institution_id, token);

    diesel::insert_into(link_credentials::table)
        .values(&row)
        .on_conflict(link_credentials::institution_id)
        .do_update()
        .set((
            link_credentials::item_id.eq(&row.item_id),
            link_credentials::access_token.eq(&row.access_token),
            link_credentials::updated_at.eq(&row.updated_at),
        ))
        .execute(conn)
        .map_err(StorageError::from)?;

    Ok(())
}
