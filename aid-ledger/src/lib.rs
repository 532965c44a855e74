//! Amanah Aid Ledger
//!
//! Eligibility classification for aid requests and an append-only,
//! hash-linked donation ledger.
//!
//! # Architecture
//!
//! - **Classifier**: Pure rules mapping a submission to Zakah / Sadaqah / Both
//! - **Single Writer**: One actor task owns the chain tail, so concurrent
//!   donations never fork the chain or over-fund a request
//! - **Hash Chain**: Each entry commits to its content and its predecessor
//! - **Injected Capabilities**: Request store, ledger storage, ids and clock
//!
//! # Invariants
//!
//! - Sequence numbers start at 0 and increase by exactly 1
//! - `entries[i].previous_hash == entries[i-1].hash`
//! - `0 <= fulfilled_amount <= amount` for every request
//! - Append-only: entries are never modified or deleted

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod eligibility;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod metrics;
pub mod requests;
pub mod storage;
pub mod types;

// Re-exports
pub use actor::LedgerStatus;
pub use chain::{verify, verify_chain, ChainVerification};
pub use config::{Config, FundingPolicy, StorageConfig};
pub use eligibility::{classify, ClassificationInput, EligibilityRules};
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerParts};
pub use metrics::Metrics;
pub use types::{
    AidRequest, AidRequestSubmission, DonationReceipt, DonationRecord, DonationType,
    Eligibility, NeedType, NewDonation, RequestStatus, ReviewDecision,
};
