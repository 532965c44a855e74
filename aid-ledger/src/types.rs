//! Core types for aid requests and the donation ledger
//!
//! All types are designed for:
//! - Stable JSON representation (camelCase, decimals as strings)
//! - Exact arithmetic (Decimal for money)
//! - Unrepresentable invalid categories (enums parsed at the boundary)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `previousHash` carried by the genesis entry
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Donor name recorded for anonymous donations
pub const ANONYMOUS_DONOR: &str = "Anonymous";

/// Kind of need declared by a beneficiary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedType {
    /// Food, shelter, basic living costs
    Essential,
    /// Tuition, books
    Education,
    /// Treatment, hospital bills
    Medical,
    /// Rent, repairs
    Housing,
    /// Debt relief
    Debt,
    /// Small business support
    Business,
    /// Anything else
    Other,
}

impl NeedType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            NeedType::Essential => "essential",
            NeedType::Education => "education",
            NeedType::Medical => "medical",
            NeedType::Housing => "housing",
            NeedType::Debt => "debt",
            NeedType::Business => "business",
            NeedType::Other => "other",
        }
    }
}

impl FromStr for NeedType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "essential" => Ok(NeedType::Essential),
            "education" => Ok(NeedType::Education),
            "medical" => Ok(NeedType::Medical),
            "housing" => Ok(NeedType::Housing),
            "debt" => Ok(NeedType::Debt),
            "business" => Ok(NeedType::Business),
            "other" => Ok(NeedType::Other),
            other => Err(Error::validation(format!("unknown need type '{}'", other))),
        }
    }
}

impl fmt::Display for NeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Charitable category a request qualifies for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eligibility {
    /// Obligatory alms only
    Zakah,
    /// Voluntary charity only
    Sadaqah,
    /// Either category
    Both,
}

impl Eligibility {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::Zakah => "zakah",
            Eligibility::Sadaqah => "sadaqah",
            Eligibility::Both => "both",
        }
    }

    /// Whether a donation of the given type may fund a request of this category
    pub fn accepts(&self, donation_type: DonationType) -> bool {
        match (self, donation_type) {
            (Eligibility::Both, _) => true,
            (Eligibility::Zakah, DonationType::Zakah) => true,
            // Sadaqah is voluntary and may go anywhere
            (_, DonationType::Sadaqah) => true,
            (Eligibility::Sadaqah, DonationType::Zakah) => false,
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category chosen by a donor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationType {
    /// Obligatory alms
    Zakah,
    /// Voluntary charity
    Sadaqah,
}

impl DonationType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationType::Zakah => "zakah",
            DonationType::Sadaqah => "sadaqah",
        }
    }
}

impl FromStr for DonationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zakah" => Ok(DonationType::Zakah),
            "sadaqah" => Ok(DonationType::Sadaqah),
            other => Err(Error::validation(format!(
                "unknown donation type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DonationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review lifecycle of an aid request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting review
    Pending,
    /// Approved by a reviewer
    Approved,
    /// Rejected by a reviewer (terminal)
    Rejected,
}

/// Reviewer verdict on a pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Approve the request
    Approve,
    /// Reject the request with a reason shown to the beneficiary
    Reject {
        /// Why the request was rejected
        reason: String,
    },
}

/// Beneficiary submission, before classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AidRequestSubmission {
    /// Owning beneficiary
    pub beneficiary_id: String,
    /// Requested total
    pub amount: Decimal,
    /// Short purpose line
    #[serde(default)]
    pub purpose: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Free-text category from the submission form
    #[serde(default)]
    pub category: String,
    /// Declared need
    pub need_type: NeedType,
    /// Informational only
    #[serde(default)]
    pub is_urgent: bool,
    /// Declared monthly income
    #[serde(default)]
    pub monthly_income: Option<Decimal>,
    /// Declared number of dependents
    #[serde(default)]
    pub dependents: Option<u32>,
    /// Holds assets beyond basic needs
    #[serde(default)]
    pub has_assets: Option<bool>,
}

/// Stored aid request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AidRequest {
    /// Unique identifier
    pub id: String,
    /// Owning beneficiary
    pub beneficiary_id: String,
    /// Requested total
    pub amount: Decimal,
    /// Short purpose line
    pub purpose: String,
    /// Free-text description
    pub description: String,
    /// Free-text category
    pub category: String,
    /// Declared need
    pub need_type: NeedType,
    /// Informational only
    pub is_urgent: bool,
    /// Declared monthly income
    pub monthly_income: Option<Decimal>,
    /// Declared number of dependents
    pub dependents: Option<u32>,
    /// Holds assets beyond basic needs
    pub has_assets: Option<bool>,
    /// Category computed at creation
    pub eligibility: Eligibility,
    /// Review state
    pub status: RequestStatus,
    /// Reason given when rejected
    pub rejection_reason: Option<String>,
    /// Running total of accepted donations
    pub fulfilled_amount: Decimal,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl AidRequest {
    /// Amount still needed
    pub fn remaining(&self) -> Decimal {
        (self.amount - self.fulfilled_amount).max(Decimal::ZERO)
    }

    /// Whether the request has been fully funded
    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled_amount >= self.amount
    }
}

/// Donation as submitted by a donor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDonation {
    /// Authenticated donor
    pub donor_id: String,
    /// Display name, replaced when anonymous
    #[serde(default)]
    pub donor_name: Option<String>,
    /// Hide the donor name on the public ledger
    #[serde(default)]
    pub is_anonymous: bool,
    /// Beneficiary that owns the request
    pub beneficiary_id: String,
    /// Request being funded
    pub request_id: String,
    /// Donated amount
    pub amount: Decimal,
    /// Category chosen by the donor
    pub donation_type: DonationType,
    /// Purpose shown on the ledger
    pub purpose: String,
}

impl NewDonation {
    /// Name written to the ledger
    pub fn public_donor_name(&self) -> String {
        match (&self.donor_name, self.is_anonymous) {
            (Some(name), false) if !name.trim().is_empty() => name.clone(),
            _ => ANONYMOUS_DONOR.to_string(),
        }
    }
}

/// Ledger entry for one accepted donation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    /// Position in the chain, 0 for genesis
    pub sequence_number: u64,
    /// Digest of this entry's content and `previous_hash`
    pub hash: String,
    /// Hash of the prior entry, or the genesis sentinel
    pub previous_hash: String,
    /// Donation identifier
    pub donation_id: String,
    /// Donor identifier
    pub donor_id: String,
    /// Public donor name
    pub donor_name: String,
    /// Beneficiary identifier
    pub beneficiary_id: String,
    /// Funded request
    pub request_id: String,
    /// Recorded amount
    pub amount: Decimal,
    /// Category of the donation
    pub donation_type: DonationType,
    /// Purpose line
    pub purpose: String,
    /// Append time
    pub timestamp: DateTime<Utc>,
    /// Entries at or after this one (not hashed)
    pub confirmations: u64,
    /// Ed25519 signature over `hash`, hex encoded (not hashed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl DonationRecord {
    /// Whether this is the first entry of the chain
    pub fn is_genesis(&self) -> bool {
        self.sequence_number == 0
    }
}

/// Result of an accepted donation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationReceipt {
    /// Appended ledger entry
    pub donation_record: DonationRecord,
    /// Part of the offered amount not recorded (capping policy)
    pub unallocated: Decimal,
}
