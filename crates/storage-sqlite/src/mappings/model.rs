//! Database models for category and group mappings.

use diesel::prelude::*;

use ledgerlink_core::classification::Mapping;

use crate::utils::parse_timestamp;

#[derive(Queryable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::category_mappings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(primary_key(transaction_name))]
pub struct CategoryMappingDB {
    pub transaction_name: String,
    pub category: String,
    pub updated_at: String,
}

#[derive(Queryable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::group_mappings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(primary_key(transaction_name))]
pub struct GroupMappingDB {
    pub transaction_name: String,
    pub group_name: String,
    pub updated_at: String,
}

impl From<CategoryMappingDB> for Mapping {
    fn from(db: CategoryMappingDB) -> Self {
        Self {
            updated_at: parse_timestamp(&db.updated_at, "updated_at"),
            transaction_name: db.transaction_name,
            value: db.category,
        }
    }
}

impl From<GroupMappingDB> for Mapping {
    fn from(db: GroupMappingDB) -> Self {
        Self {
            updated_at: parse_timestamp(&db.updated_at, "updated_at"),
            transaction_name: db.transaction_name,
            value: db.group_name,
        }
    }
}
