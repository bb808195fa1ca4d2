//! Mapping repository traits.

use async_trait::async_trait;

use super::mapping_model::{Mapping, MappingApply, MappingKind};
use crate::errors::Result;

/// Persistence for category and group mappings.
///
/// Upserts are last-write-wins and stamp `updated_at`. Mappings are never
/// deleted by a sync.
#[async_trait]
pub trait MappingRepositoryTrait: Send + Sync {
    fn get(&self, kind: MappingKind, transaction_name: &str) -> Result<Option<Mapping>>;

    fn list(&self, kind: MappingKind) -> Result<Vec<Mapping>>;

    async fn upsert(&self, kind: MappingKind, transaction_name: &str, value: &str)
        -> Result<Mapping>;

    /// Upserts the mapping and rewrites existing transactions in one unit of
    /// work. Returns how many transactions were rewritten.
    async fn set_and_apply(
        &self,
        kind: MappingKind,
        transaction_name: &str,
        value: &str,
        apply: MappingApply,
    ) -> Result<usize>;

    fn get_category(&self, transaction_name: &str) -> Result<Option<String>> {
        Ok(self
            .get(MappingKind::Category, transaction_name)?
            .map(|m| m.value))
    }

    fn get_group(&self, transaction_name: &str) -> Result<Option<String>> {
        Ok(self
            .get(MappingKind::Group, transaction_name)?
            .map(|m| m.value))
    }
}
