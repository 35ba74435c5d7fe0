//! Guest-to-account reconciliation of cart and wishlist items.
//!
//! At login the client submits the items it held while signed out. The
//! merge runs under the domain's [`MergeLock`] so that repeated login hooks
//! for the same user (several tabs, retries) fold the guest items in once.
//! The persistence side is abstracted by [`ItemStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::merge_lock::MergeLock;
use crate::pricing::{to_number, Numeric, ProductPricing};
use crate::types::{ProductId, UserId};

// ---------------------------------------------------------------------------
// Item types
// ---------------------------------------------------------------------------

fn default_guest_quantity() -> Option<Numeric> {
    Some(Numeric::Number(1.0))
}

/// An item as held in client-local storage: `{ productId, product, quantity }`.
///
/// `quantity` is kept loosely typed (number, numeric string or `null`); a
/// missing quantity means one. Invalid values are dropped by
/// [`normalize_guest_items`] rather than failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub product: Option<ProductPricing>,
    #[serde(default = "default_guest_quantity")]
    pub quantity: Option<Numeric>,
}

impl GuestItem {
    /// The quantity coerced to a number; `null` and garbage become zero.
    pub fn quantity_value(&self) -> f64 {
        to_number(self.quantity.as_ref())
    }
}

/// A persisted account line. Wishlist lines always carry quantity 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// How guest lines combine with existing account lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Cart: quantities for the same product add up, clamped at `max_quantity`.
    SumQuantities { max_quantity: u32 },
    /// Wishlist: set union on product id.
    Union,
}

/// Whether guest items are folded into the account or replace it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    #[default]
    Combine,
    Replace,
}

/// Counts reported back to the caller after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// Lines that did not exist on the account before.
    pub added: usize,
    /// Existing lines whose quantity changed.
    pub updated: usize,
    /// Lines on the account after the merge.
    pub total: usize,
}

/// Result of [`plan_merge`]: the lines to write plus the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    /// Only lines that are new or whose quantity changed.
    pub changed: Vec<AccountItem>,
    pub summary: MergeSummary,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why a merge did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The lock was held or cooling down; another merge covers this login.
    Locked,
    /// The guest payload held no usable items; the lock was not taken.
    NothingToMerge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged(MergeSummary),
    Skipped(SkipReason),
}

// ---------------------------------------------------------------------------
// Persistence contract
// ---------------------------------------------------------------------------

/// Account-side item persistence for one domain (cart or wishlist).
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Current account lines, in insertion order.
    async fn account_items(&self, user_id: UserId) -> Result<Vec<AccountItem>, CoreError>;

    /// Fold normalized guest lines into the account atomically.
    async fn merge_items(
        &self,
        user_id: UserId,
        guest: &[AccountItem],
    ) -> Result<MergeSummary, CoreError>;

    /// Replace every account line with `items`.
    async fn replace_account_items(
        &self,
        user_id: UserId,
        items: &[AccountItem],
    ) -> Result<(), CoreError>;

    /// Remove every account line.
    async fn clear_account_items(&self, user_id: UserId) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Clean up a client payload.
///
/// - Drops non-positive product ids.
/// - Drops quantities that are not positive whole numbers.
/// - Collapses duplicates by summing, clamping every line at `max_quantity`.
/// - Keeps first-seen order.
pub fn normalize_guest_items(items: &[GuestItem], max_quantity: u32) -> Vec<AccountItem> {
    let mut lines: Vec<AccountItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<ProductId, usize> = HashMap::with_capacity(items.len());

    for item in items {
        let q = item.quantity_value();
        if item.product_id <= 0 || q.is_nan() || q <= 0.0 || q.fract() != 0.0 {
            continue;
        }
        let quantity = q.min(f64::from(max_quantity)) as u32;

        match index.get(&item.product_id) {
            Some(&i) => {
                let line = &mut lines[i];
                line.quantity = line.quantity.saturating_add(quantity).min(max_quantity);
            }
            None => {
                index.insert(item.product_id, lines.len());
                lines.push(AccountItem {
                    product_id: item.product_id,
                    quantity,
                });
            }
        }
    }
    lines
}

/// Decide which lines change when `guest` is folded into `account`.
pub fn plan_merge(account: &[AccountItem], guest: &[AccountItem], rule: MergeRule) -> MergePlan {
    let existing: HashMap<ProductId, u32> = account
        .iter()
        .map(|line| (line.product_id, line.quantity))
        .collect();

    let mut changed = Vec::new();
    let mut added = 0;
    let mut updated = 0;

    for line in guest {
        match (existing.get(&line.product_id), rule) {
            (None, MergeRule::SumQuantities { max_quantity }) => {
                added += 1;
                changed.push(AccountItem {
                    product_id: line.product_id,
                    quantity: line.quantity.min(max_quantity),
                });
            }
            (None, MergeRule::Union) => {
                added += 1;
                changed.push(AccountItem {
                    product_id: line.product_id,
                    quantity: 1,
                });
            }
            (Some(&current), MergeRule::SumQuantities { max_quantity }) => {
                let merged = current.saturating_add(line.quantity).min(max_quantity);
                if merged != current {
                    updated += 1;
                    changed.push(AccountItem {
                        product_id: line.product_id,
                        quantity: merged,
                    });
                }
            }
            (Some(_), MergeRule::Union) => {}
        }
    }

    MergePlan {
        changed,
        summary: MergeSummary {
            added,
            updated,
            total: account.len() + added,
        },
    }
}

// ---------------------------------------------------------------------------
// Merge routine
// ---------------------------------------------------------------------------

/// Run one guest-to-account merge under `lock`.
///
/// The lock is released whether or not the store succeeds; the store's error
/// is then returned. A denied acquisition is reported as
/// [`MergeOutcome::Skipped`], not as an error.
pub async fn run_merge(
    lock: &dyn MergeLock,
    store: &dyn ItemStore,
    user_id: UserId,
    guest_items: &[GuestItem],
    mode: MergeMode,
    max_quantity: u32,
) -> Result<MergeOutcome, CoreError> {
    let domain = lock.domain();
    let lines = normalize_guest_items(guest_items, max_quantity);
    if lines.is_empty() {
        tracing::debug!(%domain, user_id, "No guest items to merge");
        return Ok(MergeOutcome::Skipped(SkipReason::NothingToMerge));
    }

    if !lock.acquire(user_id).await? {
        tracing::debug!(%domain, user_id, "Merge skipped: lock held or cooling down");
        return Ok(MergeOutcome::Skipped(SkipReason::Locked));
    }

    let result = match mode {
        MergeMode::Combine => store.merge_items(user_id, &lines).await,
        MergeMode::Replace => replace_with_guest(store, user_id, &lines).await,
    };

    if let Err(e) = lock.release(user_id).await {
        tracing::error!(%domain, user_id, error = %e, "Failed to release merge lock");
    }

    let summary = result?;
    tracing::info!(
        %domain,
        user_id,
        ?mode,
        added = summary.added,
        updated = summary.updated,
        total = summary.total,
        "Guest items merged into account"
    );
    Ok(MergeOutcome::Merged(summary))
}

async fn replace_with_guest(
    store: &dyn ItemStore,
    user_id: UserId,
    lines: &[AccountItem],
) -> Result<MergeSummary, CoreError> {
    let previous = store.account_items(user_id).await?;
    store.replace_account_items(user_id, lines).await?;
    // Re-read: the store may drop lines it cannot persist.
    let current = store.account_items(user_id).await?;

    let before: HashMap<ProductId, u32> = previous
        .iter()
        .map(|line| (line.product_id, line.quantity))
        .collect();
    let mut summary = MergeSummary {
        total: current.len(),
        ..MergeSummary::default()
    };
    for line in &current {
        match before.get(&line.product_id) {
            None => summary.added += 1,
            Some(&q) if q != line.quantity => summary.updated += 1,
            Some(_) => {}
        }
    }
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
