//! Campaign and donation records kept in relational storage.
//!
//! Monetary amounts are integer minor currency units (paise) throughout, so
//! running totals never accumulate floating-point drift.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};

/// A fundraising campaign with its running total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub amount_needed: u64,
    pub amount_raised: u64,
    pub created_at: String,
}

/// Input for campaign creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub amount_needed: u64,
}

impl NewCampaign {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::InvalidCampaign(
                "title must not be empty".to_string(),
            ));
        }
        if self.amount_needed == 0 {
            return Err(LedgerError::InvalidCampaign(
                "amount_needed must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A confirmed donation, cross-referencing the ledger block that recorded
/// it via `block_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub amount: u64,
    pub donor_name: String,
    pub payment_id: String,
    pub campaign_id: i64,
    pub block_hash: String,
    pub created_at: String,
}

/// Input for recording a donation once its payment is verified and its
/// ledger block is appended.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub amount: u64,
    pub donor_name: String,
    pub payment_id: String,
    pub campaign_id: i64,
    pub block_hash: String,
}
