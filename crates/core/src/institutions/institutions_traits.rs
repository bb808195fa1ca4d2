//! Institution repository traits.

use async_trait::async_trait;

use super::institutions_model::{Institution, InstitutionHealth, InstitutionSummary, LinkCredential};
use crate::errors::Result;

/// Read access to linked institutions and their credentials.
///
/// Institutions and credentials are written only as part of a sync batch
/// (see `SyncStoreTrait`), so the write surface here is limited to health.
#[async_trait]
pub trait InstitutionRepositoryTrait: Send + Sync {
    fn get(&self, institution_id: &str) -> Result<Option<Institution>>;

    /// Resolves the institution that owns an aggregator item.
    fn get_by_item_id(&self, item_id: &str) -> Result<Option<Institution>>;

    fn list_summaries(&self) -> Result<Vec<InstitutionSummary>>;

    fn get_credential(&self, institution_id: &str) -> Result<Option<LinkCredential>>;

    async fn set_health(&self, institution_id: &str, health: InstitutionHealth) -> Result<()>;
}
