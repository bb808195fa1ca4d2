//! Classification precedence and pluggable override rules.
//!
//! For every transaction written by a sync the stored category and group are
//! decided in this order:
//!
//! 1. a user mapping for the transaction's display name, per field
//! 2. otherwise the vendor value verbatim, including `None`
//! 3. each override rule in list order, which may rewrite the result

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::{Error, Result, ValidationError};

/// Category and group of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: Option<String>,
    pub group: Option<String>,
}

impl Classification {
    pub fn new(category: Option<String>, group: Option<String>) -> Self {
        Self { category, group }
    }
}

/// What a rule may look at when deciding whether it applies.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationContext<'a> {
    pub account_id: &'a str,
    pub account_name: Option<&'a str>,
    pub transaction_name: &'a str,
}

/// A vendor-specific correction evaluated after the mapping lookup.
pub trait OverrideRule: Send + Sync {
    fn name(&self) -> &str;

    /// Rewrites `current` when the rule matches. Returns whether it matched.
    fn apply(&self, ctx: &ClassificationContext<'_>, current: &mut Classification) -> bool;
}

/// Reclassifies every transaction of an account into a fixed category and
/// group, except for the listed transaction names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverrideRule {
    pub name: String,
    #[serde(default)]
    pub account_ids: Vec<String>,
    #[serde(default)]
    pub account_names: Vec<String>,
    pub category: String,
    pub group: String,
    #[serde(default)]
    pub except_transaction_names: Vec<String>,
}

impl AccountOverrideRule {
    fn matches_account(&self, ctx: &ClassificationContext<'_>) -> bool {
        self.account_ids.iter().any(|id| id == ctx.account_id)
            || ctx
                .account_name
                .is_some_and(|name| self.account_names.iter().any(|n| n == name))
    }
}

impl OverrideRule for AccountOverrideRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &ClassificationContext<'_>, current: &mut Classification) -> bool {
        if !self.matches_account(ctx) {
            return false;
        }
        if self
            .except_transaction_names
            .iter()
            .any(|n| n == ctx.transaction_name)
        {
            return false;
        }
        current.category = Some(self.category.clone());
        current.group = Some(self.group.clone());
        true
    }
}

/// Ordered list of override rules.
#[derive(Clone, Default)]
pub struct OverrideRules {
    rules: Vec<Arc<dyn OverrideRule>>,
}

impl fmt::Debug for OverrideRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.name().to_string()))
            .finish()
    }
}

impl OverrideRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl OverrideRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn push(&mut self, rule: Arc<dyn OverrideRule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parses a JSON array of account rules.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Vec<AccountOverrideRule> = serde_json::from_str(json).map_err(|e| {
            Error::Validation(ValidationError::InvalidInput(format!(
                "Invalid classification rules: {}",
                e
            )))
        })?;
        Ok(parsed
            .into_iter()
            .fold(OverrideRules::new(), |rules, rule| rules.with(rule)))
    }

    /// Runs every rule in order. Later rules see earlier rewrites.
    pub fn apply(&self, ctx: &ClassificationContext<'_>, current: &mut Classification) {
        for rule in &self.rules {
            if rule.apply(ctx, current) {
                log::debug!(
                    "Override rule '{}' reclassified '{}' on account {}",
                    rule.name(),
                    ctx.transaction_name,
                    ctx.account_id
                );
            }
        }
    }
}

/// Decides the stored classification of one transaction.
pub fn resolve_classification(
    vendor: Classification,
    mapped: Classification,
    ctx: &ClassificationContext<'_>,
    rules: &OverrideRules,
) -> Classification {
    let mut resolved = Classification {
        category: mapped.category.or(vendor.category),
        group: mapped.group.or(vendor.group),
    };
    rules.apply(ctx, &mut resolved);
    resolved
}
