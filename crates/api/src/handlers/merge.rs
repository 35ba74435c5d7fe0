//! Request and response shapes shared by the cart and wishlist merge endpoints.

use serde::{Deserialize, Serialize};
use storefront_core::merge::{GuestItem, MergeMode, MergeOutcome, SkipReason};

/// Body of `POST /cart/merge` and `POST /wishlist/merge`: the items the
/// client held while signed out.
#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    #[serde(default)]
    pub items: Vec<GuestItem>,
    #[serde(default)]
    pub mode: MergeMode,
}

/// Merge result. A skipped merge is a normal outcome, not an error.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeResponse {
    Merged {
        added: usize,
        updated: usize,
        total: usize,
        /// The client may now drop its local guest copy.
        clear_guest: bool,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl From<MergeOutcome> for MergeResponse {
    fn from(outcome: MergeOutcome) -> Self {
        match outcome {
            MergeOutcome::Merged(summary) => MergeResponse::Merged {
                added: summary.added,
                updated: summary.updated,
                total: summary.total,
                clear_guest: true,
            },
            MergeOutcome::Skipped(reason) => MergeResponse::Skipped { reason },
        }
    }
}
