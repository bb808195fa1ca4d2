//! Repository for user category/group mappings.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use ledgerlink_core::classification::{
    Classification, Mapping, MappingApply, MappingKind, MappingRepositoryTrait,
};
use ledgerlink_core::errors::{Error, Result, ValidationError};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{category_mappings, group_mappings, transactions};
use crate::utils::{chunk_for_sqlite, timestamp_to_text};

use super::model::{CategoryMappingDB, GroupMappingDB};

pub struct MappingRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl MappingRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl MappingRepositoryTrait for MappingRepository {
    fn get(&self, kind: MappingKind, transaction_name: &str) -> Result<Option<Mapping>> {
        let mut conn = get_connection(&self.pool)?;

        let mapping = match kind {
            MappingKind::Category => category_mappings::table
                .find(transaction_name)
                .select(CategoryMappingDB::as_select())
                .first::<CategoryMappingDB>(&mut conn)
                .optional()
                .map_err(StorageError::from)?
                .map(Mapping::from),
            MappingKind::Group => group_mappings::table
                .find(transaction_name)
                .select(GroupMappingDB::as_select())
                .first::<GroupMappingDB>(&mut conn)
                .optional()
                .map_err(StorageError::from)?
                .map(Mapping::from),
        };
        Ok(mapping)
    }

    fn list(&self, kind: MappingKind) -> Result<Vec<Mapping>> {
        let mut conn = get_connection(&self.pool)?;

        let mappings = match kind {
            MappingKind::Category => category_mappings::table
                .select(CategoryMappingDB::as_select())
                .order(category_mappings::transaction_name.asc())
                .load::<CategoryMappingDB>(&mut conn)
                .map_err(StorageError::from)?
                .into_iter()
                .map(Mapping::from)
                .collect(),
            MappingKind::Group => group_mappings::table
                .select(GroupMappingDB::as_select())
                .order(group_mappings::transaction_name.asc())
                .load::<GroupMappingDB>(&mut conn)
                .map_err(StorageError::from)?
                .into_iter()
                .map(Mapping::from)
                .collect(),
        };
        Ok(mappings)
    }

    async fn upsert(
        &self,
        kind: MappingKind,
        transaction_name: &str,
        value: &str,
    ) -> Result<Mapping> {
        let (name, value) = validate(transaction_name, value)?;
        self.writer
            .exec(move |conn| upsert_mapping(conn, kind, &name, &value))
            .await
    }

    async fn set_and_apply(
        &self,
        kind: MappingKind,
        transaction_name: &str,
        value: &str,
        apply: MappingApply,
    ) -> Result<usize> {
        let (name, value) = validate(transaction_name, value)?;
        self.writer
            .exec(move |conn| {
                upsert_mapping(conn, kind, &name, &value)?;

                let now = timestamp_to_text(&Utc::now());
                let updated = match (&apply, kind) {
                    (MappingApply::None, _) => 0,
                    (MappingApply::AllWithName, MappingKind::Category) => diesel::update(
                        transactions::table.filter(transactions::name.eq(&name)),
                    )
                    .set((
                        transactions::category.eq(&value),
                        transactions::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?,
                    (MappingApply::AllWithName, MappingKind::Group) => diesel::update(
                        transactions::table.filter(transactions::name.eq(&name)),
                    )
                    .set((
                        transactions::group_name.eq(&value),
                        transactions::updated_at.eq(&now),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?,
                    (MappingApply::Single(id), MappingKind::Category) => {
                        diesel::update(transactions::table.find(id))
                            .set((
                                transactions::category.eq(&value),
                                transactions::updated_at.eq(&now),
                            ))
                            .execute(conn)
                            .map_err(StorageError::from)?
                    }
                    (MappingApply::Single(id), MappingKind::Group) => {
                        diesel::update(transactions::table.find(id))
                            .set((
                                transactions::group_name.eq(&value),
                                transactions::updated_at.eq(&now),
                            ))
                            .execute(conn)
                            .map_err(StorageError::from)?
                    }
                };

                if let MappingApply::Single(id) = &apply {
                    if updated == 0 {
                        return Err(Error::NotFound(format!("Transaction {} not found", id)));
                    }
                }

                info!(
                    "Set {} mapping '{}' -> '{}', {} transaction(s) updated",
                    kind, name, value, updated
                );
                Ok(updated)
            })
            .await
    }
}

fn validate(transaction_name: &str, value: &str) -> Result<(String, String)> {
    let name = transaction_name.trim();
    let value = value.trim();
    if name.is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            "transactionName".to_string(),
        )));
    }
    if value.is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            "value".to_string(),
        )));
    }
    Ok((name.to_string(), value.to_string()))
}

fn upsert_mapping(
    conn: &mut SqliteConnection,
    kind: MappingKind,
    name: &str,
    value: &str,
) -> Result<Mapping> {
    let now = timestamp_to_text(&Utc::now());
    match kind {
        MappingKind::Category => {
            let row = CategoryMappingDB {
                transaction_name: name.to_string(),
                category: value.to_string(),
                updated_at: now,
            };
            diesel::insert_into(category_mappings::table)
                .values(&row)
                .on_conflict(category_mappings::transaction_name)
                .do_update()
                .set((
                    category_mappings::category.eq(&row.category),
                    category_mappings::updated_at.eq(&row.updated_at),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
            Ok(row.into())
        }
        MappingKind::Group => {
            let row = GroupMappingDB {
                transaction_name: name.to_string(),
                group_name: value.to_string(),
                updated_at: now,
            };
            diesel::insert_into(group_mappings::table)
                .values(&row)
                .on_conflict(group_mappings::transaction_name)
                .do_update()
                .set((
                    group_mappings::group_name.eq(&row.group_name),
                    group_mappings::updated_at.eq(&row.updated_at),
                ))
                .execute(conn)
                .map_err(StorageError::from)?;
            Ok(row.into())
        }
    }
}

/// Loads both mapping kinds for the given transaction names.
pub(crate) fn load_mappings(
    conn: &mut SqliteConnection,
    names: &[String],
) -> Result<HashMap<String, Classification>> {
    let mut mapped: HashMap<String, Classification> = HashMap::new();

    for chunk in chunk_for_sqlite(names) {
        let categories = category_mappings::table
            .filter(category_mappings::transaction_name.eq_any(chunk))
            .select((category_mappings::transaction_name, category_mappings::category))
            .load::<(String, String)>(conn)
            .map_err(StorageError::from)?;
        for (name, category) in categories {
            mapped.entry(name).or_default().category = Some(category);
        }

        let groups = group_mappings::table
            .filter(group_mappings::transaction_name.eq_any(chunk))
            .select((group_mappings::transaction_name, group_mappings::group_name))
            .load::<(String, String)>(conn)
            .map_err(StorageError::from)?;
        for (name, group) in groups {
            mapped.entry(name).or_default().group = Some(group);
        }
    }

    debug!("Loaded mappings for {} of {} names", mapped.len(), names.len());
    Ok(mapped)
}
