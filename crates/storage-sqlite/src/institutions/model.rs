//! Database models for institutions and link credentials.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use ledgerlink_core::institutions::{
    ExchangedToken, Institution, InstitutionHealth, InstitutionSnapshot, LinkCredential,
};

use crate::utils::{parse_opt_timestamp, parse_timestamp, timestamp_to_text};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::institutions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InstitutionDB {
    pub id: String,
    pub name: String,
    pub oauth: bool,
    /// JSON array of product names.
    pub products: String,
    pub health: String,
    pub last_refresh_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl InstitutionDB {
    pub fn from_snapshot(snapshot: &InstitutionSnapshot, refreshed_at: &DateTime<Utc>) -> Self {
        let now = timestamp_to_text(&Utc::now());
        Self {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            oauth: snapshot.oauth,
            products: serde_json::to_string(&snapshot.products).unwrap_or_else(|_| "[]".into()),
            health: snapshot.health.as_str().to_string(),
            last_refresh_at: Some(timestamp_to_text(refreshed_at)),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl From<InstitutionDB> for Institution {
    fn from(db: InstitutionDB) -> Self {
        let products = serde_json::from_str::<Vec<String>>(&db.products).unwrap_or_else(|e| {
            error!(
                "Invalid products JSON for institution {}: {}",
                db.id, e
            );
            Vec::new()
        });
        let health = InstitutionHealth::from_str(&db.health).unwrap_or_else(|e| {
            error!("Invalid health for institution {}: {}", db.id, e);
            InstitutionHealth::Degraded
        });

        Self {
            id: db.id,
            name: db.name,
            oauth: db.oauth,
            products,
            health,
            last_refresh_at: parse_opt_timestamp(db.last_refresh_at.as_deref(), "last_refresh_at"),
            created_at: parse_timestamp(&db.created_at, "created_at"),
            updated_at: parse_timestamp(&db.updated_at, "updated_at"),
        }
    }
}

#[derive(Queryable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::link_credentials)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(primary_key(institution_id))]
pub struct LinkCredentialDB {
    pub institution_id: String,
    pub item_id: String,
    pub access_token: String,
    pub created_at: String,
    pub updated_at: String,
}

impl LinkCredentialDB {
    pub fn new(institution_id: &str, token: &ExchangedToken) -> Self {
        let now = timestamp_to_text(&Utc::now());
        Self {
            institution_id: institution_id.to_string(),
            item_id: token.item_id.clone(),
            access_token: token.access_token.clone(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl From<LinkCredentialDB> for LinkCredential {
    fn from(db: LinkCredentialDB) -> Self {
        Self {
            institution_id: db.institution_id,
            item_id: db.item_id,
            access_token: db.access_token,
            created_at: parse_timestamp(&db.created_at, "created_at"),
        }
    }
}
