//! Main ledger orchestration layer
//!
//! This module ties together the classifier, the request store and the
//! ledger actor into a high-level API for aid requests and donations.
//!
//! # Example
//!
//! ```no_run
//! use aid_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> aid_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config).await?;
//!
//!     // let request = ledger.submit_request(submission)?;
//!     // let receipt = ledger.donate(donation).await?;
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, ActorParts, AppendPolicy, LedgerHandle, LedgerStatus},
    chain::{self, ChainVerification},
    config::StorageConfig,
    crypto::KeyPair,
    eligibility::ClassificationInput,
    ids::{Clock, IdGenerator, SystemClock, UuidIdGenerator, REQUEST_PREFIX},
    metrics::Metrics,
    requests::{MemoryRequestStore, RequestStore},
    storage::{LedgerStorage, MemoryLedgerStorage},
    types::{
        AidRequest, AidRequestSubmission, DonationReceipt, DonationRecord, NewDonation,
        RequestStatus, ReviewDecision,
    },
    Config, Error, Result,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Collaborators injected into a ledger
pub struct LedgerParts {
    /// Aid request store
    pub requests: Arc<dyn RequestStore>,
    /// Entry storage
    pub storage: Arc<dyn LedgerStorage>,
    /// Id source for requests and donations
    pub ids: Arc<dyn IdGenerator>,
    /// Timestamp source
    pub clock: Arc<dyn Clock>,
    /// Signs entry hashes when present
    pub keypair: Option<KeyPair>,
    /// Metrics sink
    pub metrics: Metrics,
}

impl LedgerParts {
    /// In-memory stores, UUID ids and the system clock
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            requests: Arc::new(MemoryRequestStore::new()),
            storage: Arc::new(MemoryLedgerStorage::new()),
            ids: Arc::new(UuidIdGenerator),
            clock: Arc::new(SystemClock),
            keypair: None,
            metrics: new_metrics()?,
        })
    }
}

impl std::fmt::Debug for LedgerParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerParts")
            .field("signing", &self.keypair.is_some())
            .finish_non_exhaustive()
    }
}

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for appends and chain reads
    handle: LedgerHandle,

    /// Request store (internally synchronized)
    requests: Arc<dyn RequestStore>,

    ids: Arc<dyn IdGenerator>,

    clock: Arc<dyn Clock>,

    /// Hex public key, if entries are signed
    public_key_hex: Option<String>,

    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("handle", &self.handle)
            .field("public_key_hex", &self.public_key_hex)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Open ledger with configuration
    ///
    /// Requests always live in a [`MemoryRequestStore`]; only the chain is
    /// persisted by the rocksdb backend. Use [`Ledger::open_with`] to inject a
    /// durable request store.
    pub async fn open(config: Config) -> Result<Self> {
        let mut parts = LedgerParts::in_memory()?;
        parts.storage = open_storage(&config.storage)?;
        if let Some(seed) = &config.signing_seed_hex {
            parts.keypair = Some(KeyPair::from_seed_hex(seed)?);
        }
        Self::open_with(config, parts).await
    }

    /// Open ledger with injected collaborators
    pub async fn open_with(config: Config, parts: LedgerParts) -> Result<Self> {
        let public_key_hex = parts.keypair.as_ref().map(KeyPair::public_key_hex);
        let requests = parts.requests.clone();
        let ids = parts.ids.clone();
        let clock = parts.clock.clone();
        let metrics = parts.metrics.clone();

        let policy = AppendPolicy {
            funding_policy: config.funding_policy,
            enforce_donation_category: config.enforce_donation_category,
        };
        let handle = spawn_ledger_actor(
            ActorParts {
                storage: parts.storage,
                requests: parts.requests,
                ids: parts.ids,
                clock: parts.clock,
                keypair: parts.keypair,
                metrics: parts.metrics,
            },
            policy,
            config.mailbox_capacity,
        );

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            funding_policy = ?config.funding_policy,
            signing = public_key_hex.is_some(),
            "Ledger opened"
        );

        Ok(Self {
            handle,
            requests,
            ids,
            clock,
            public_key_hex,
            metrics,
            config,
        })
    }

    /// Classify and store a beneficiary submission
    ///
    /// The request starts as pending with nothing fulfilled.
    pub fn submit_request(&self, submission: AidRequestSubmission) -> Result<AidRequest> {
        if submission.beneficiary_id.trim().is_empty() {
            return Err(Error::validation("beneficiaryId must not be empty"));
        }

        let eligibility = self
            .config
            .eligibility
            .classify(&ClassificationInput::from(&submission))?;

        let now = self.clock.now();
        let request = self.requests.create(AidRequest {
            id: self.ids.next_id(REQUEST_PREFIX),
            beneficiary_id: submission.beneficiary_id,
            amount: submission.amount,
            purpose: submission.purpose,
            description: submission.description,
            category: submission.category,
            need_type: submission.need_type,
            is_urgent: submission.is_urgent,
            monthly_income: submission.monthly_income,
            dependents: submission.dependents,
            has_assets: submission.has_assets,
            eligibility,
            status: RequestStatus::Pending,
            rejection_reason: None,
            fulfilled_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        })?;

        self.metrics.record_request(eligibility.as_str());
        tracing::info!(
            request_id = %request.id,
            beneficiary_id = %request.beneficiary_id,
            eligibility = %eligibility,
            amount = %request.amount,
            "Aid request submitted"
        );

        Ok(request)
    }

    /// Approve or reject a pending request
    pub fn review_request(&self, id: &str, decision: ReviewDecision) -> Result<AidRequest> {
        let request = self.requests.get(id)?;
        if request.status != RequestStatus::Pending {
            return Err(Error::validation(format!(
                "request {} has already been reviewed",
                id
            )));
        }

        let (status, reason) = match decision {
            ReviewDecision::Approve => (RequestStatus::Approved, None),
            ReviewDecision::Reject { reason } => {
                if reason.trim().is_empty() {
                    return Err(Error::validation("rejection reason must not be empty"));
                }
                (RequestStatus::Rejected, Some(reason))
            }
        };

        let request = self
            .requests
            .update_status(id, status, reason, self.clock.now())?;
        tracing::info!(request_id = %id, status = ?request.status, "Aid request reviewed");
        Ok(request)
    }

    /// Get a request by id
    pub fn get_request(&self, id: &str) -> Result<AidRequest> {
        self.requests.get(id)
    }

    /// Requests owned by a beneficiary
    pub fn requests_for_beneficiary(&self, beneficiary_id: &str) -> Result<Vec<AidRequest>> {
        self.requests.list_by_beneficiary(beneficiary_id)
    }

    /// Every request, oldest first
    pub fn list_requests(&self) -> Result<Vec<AidRequest>> {
        self.requests.list()
    }

    /// Record a donation on the chain
    ///
    /// Shape checks happen here; everything that depends on the request or
    /// the tail runs inside the actor.
    pub async fn donate(&self, donation: NewDonation) -> Result<DonationReceipt> {
        if let Err(e) = validate_donation(&donation) {
            self.metrics.record_rejection("validation");
            tracing::warn!(request_id = %donation.request_id, "Donation refused: {}", e);
            return Err(e);
        }

        let result = self.handle.append_donation(donation).await;
        if let Err(e) = &result {
            if e.is_integrity_failure() {
                tracing::error!("Donation refused: {}", e);
            } else {
                tracing::warn!("Donation refused: {}", e);
            }
        }
        result
    }

    /// All entries, oldest first, with current confirmations
    pub async fn entries(&self) -> Result<Vec<DonationRecord>> {
        self.handle.entries().await
    }

    /// Entries made by one donor
    pub async fn donations_by_donor(&self, donor_id: &str) -> Result<Vec<DonationRecord>> {
        self.handle.donor_entries(donor_id).await
    }

    /// Verify hashes, links and (when signing) signatures
    ///
    /// A failed verification halts further appends.
    pub async fn verify(&self) -> Result<ChainVerification> {
        self.handle.verify().await
    }

    /// Check entry signatures against a public key
    pub async fn verify_signatures(&self, public_key: &[u8; 32]) -> Result<ChainVerification> {
        let entries = self.handle.entries().await?;
        Ok(chain::verify_signatures(&entries, public_key))
    }

    /// Head of the chain and halt state
    pub async fn status(&self) -> Result<LedgerStatus> {
        self.handle.status().await
    }

    /// Sum of the donations recorded for a request
    ///
    /// Rebuilds the fulfilled amount from the chain alone.
    pub async fn fulfilled_from_ledger(&self, request_id: &str) -> Result<Decimal> {
        let entries = self.handle.entries().await?;
        Ok(entries
            .iter()
            .filter(|entry| entry.request_id == request_id)
            .map(|entry| entry.amount)
            .sum())
    }

    /// Hex public key used for entry signatures
    pub fn public_key_hex(&self) -> Option<&str> {
        self.public_key_hex.as_deref()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown ledger
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }
}

fn validate_donation(donation: &NewDonation) -> Result<()> {
    if donation.donor_id.trim().is_empty() {
        return Err(Error::validation("donorId must not be empty"));
    }
    if donation.beneficiary_id.trim().is_empty() {
        return Err(Error::validation("beneficiaryId must not be empty"));
    }
    if donation.request_id.trim().is_empty() {
        return Err(Error::validation("requestId must not be empty"));
    }
    if donation.purpose.trim().is_empty() {
        return Err(Error::validation("purpose must not be empty"));
    }
    if donation.amount <= Decimal::ZERO {
        return Err(Error::validation("Amount must be positive"));
    }
    Ok(())
}

fn new_metrics() -> Result<Metrics> {
    Metrics::new().map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))
}

fn open_storage(storage: &StorageConfig) -> Result<Arc<dyn LedgerStorage>> {
    match storage {
        StorageConfig::Memory => Ok(Arc::new(MemoryLedgerStorage::new())),
        #[cfg(feature = "rocksdb")]
        StorageConfig::Rocksdb { data_dir } => Ok(Arc::new(
            crate::storage::RocksLedgerStorage::open(data_dir)?,
        )),
        #[cfg(not(feature = "rocksdb"))]
        StorageConfig::Rocksdb { .. } => Err(Error::Config(
            "rocksdb storage requires the `rocksdb` feature".to_string(),
        )),
    }
}
