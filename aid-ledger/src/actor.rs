//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the chain tail, so appends can never interleave
//! - Each append runs read-tail → funding check → hash → persist → fulfil
//!   to completion before the next message is taken
//! - Async message passing with backpressure (bounded mailbox)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │          HTTP handlers / tests / other callers        │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │  tail self-check → link → sign → LedgerStorage        │
//! │  → RequestStore::update_fulfilled                     │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Once the actor sees a broken chain (startup check, tail self-check, or a
//! failed verification) it halts: reads keep working, appends are refused.

use crate::{
    chain::{self, compute_hash, ChainVerification},
    config::FundingPolicy,
    crypto::KeyPair,
    ids::{Clock, IdGenerator, DONATION_PREFIX},
    metrics::Metrics,
    requests::RequestStore,
    storage::LedgerStorage,
    types::{AidRequest, DonationReceipt, DonationRecord, NewDonation, RequestStatus, GENESIS_PREVIOUS_HASH},
    Error, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Append a donation
    AppendDonation {
        donation: NewDonation,
        response: oneshot::Sender<Result<DonationReceipt>>,
    },

    /// All entries, with current confirmations
    GetEntries {
        response: oneshot::Sender<Result<Vec<DonationRecord>>>,
    },

    /// Entries made by one donor
    GetDonorEntries {
        donor_id: String,
        response: oneshot::Sender<Result<Vec<DonationRecord>>>,
    },

    /// Verify the whole chain
    Verify {
        response: oneshot::Sender<Result<ChainVerification>>,
    },

    /// Chain length, tail hash and halt state
    GetStatus {
        response: oneshot::Sender<Result<LedgerStatus>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Snapshot of the ledger's head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatus {
    /// Number of entries
    pub entries: u64,
    /// Hash of the last entry
    pub tail_hash: Option<String>,
    /// Why appends are refused, if they are
    pub halted: Option<String>,
}

/// Acceptance rules applied inside the critical section
#[derive(Debug, Clone, Copy)]
pub struct AppendPolicy {
    /// Over-funding behaviour
    pub funding_policy: FundingPolicy,
    /// Refuse Zakah donations to Sadaqah-only requests
    pub enforce_donation_category: bool,
}

/// Collaborators owned by the actor
pub struct ActorParts {
    /// Entry storage
    pub storage: Arc<dyn LedgerStorage>,
    /// Aid request store
    pub requests: Arc<dyn RequestStore>,
    /// Donation id source
    pub ids: Arc<dyn IdGenerator>,
    /// Timestamp source
    pub clock: Arc<dyn Clock>,
    /// Signs entry hashes when present
    pub keypair: Option<KeyPair>,
    /// Metrics sink
    pub metrics: Metrics,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    parts: ActorParts,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    policy: AppendPolicy,

    /// Set once the chain is found broken
    halted: Option<String>,
}

impl std::fmt::Debug for ActorParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorParts")
            .field("signing", &self.keypair.is_some())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for LedgerActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerActor")
            .field("parts", &self.parts)
            .field("policy", &self.policy)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        parts: ActorParts,
        mailbox: mpsc::Receiver<LedgerMessage>,
        policy: AppendPolicy,
    ) -> Self {
        Self {
            parts,
            mailbox,
            policy,
            halted: None,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        // Storage may hold a chain from a previous run
        match self.verify() {
            Ok(verification) if verification.valid => {
                tracing::info!(
                    entries = verification.entries_checked,
                    "Ledger actor started"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Startup verification failed: {}", e),
        }

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }

        tracing::info!("Ledger actor stopped");
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::AppendDonation { donation, response } => {
                let result = self.append(donation);
                let _ = response.send(result);
            }

            LedgerMessage::GetEntries { response } => {
                let result = self
                    .parts
                    .storage
                    .entries()
                    .map(with_confirmations);
                let _ = response.send(result);
            }

            LedgerMessage::GetDonorEntries { donor_id, response } => {
                let result = self.donor_entries(&donor_id);
                let _ = response.send(result);
            }

            LedgerMessage::Verify { response } => {
                let result = self.verify();
                let _ = response.send(result);
            }

            LedgerMessage::GetStatus { response } => {
                let result = self.status();
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    fn append(&mut self, donation: NewDonation) -> Result<DonationReceipt> {
        let started = Instant::now();

        let result = self.try_append(donation);
        match &result {
            Ok(receipt) => {
                self.parts.metrics.record_donation(
                    started.elapsed().as_secs_f64(),
                    receipt.donation_record.sequence_number + 1,
                );
            }
            Err(e) => {
                self.parts.metrics.record_rejection(rejection_label(e));
                if e.is_integrity_failure() {
                    self.halt(e.to_string());
                }
            }
        }
        result
    }

    fn try_append(&mut self, donation: NewDonation) -> Result<DonationReceipt> {
        if self.halted.is_some() {
            return Err(Error::LedgerHalted);
        }

        let request = self.parts.requests.get(&donation.request_id)?;
        self.check_acceptance(&donation, &request)?;
        let (recorded, unallocated) = self.apply_funding_policy(&donation, &request)?;

        let tail = self.parts.storage.tail()?;
        if let Some(tail) = &tail {
            self.self_check_tail(tail)?;
        }
        let (sequence_number, previous_hash) = match tail {
            Some(tail) => (tail.sequence_number + 1, tail.hash),
            None => (0, GENESIS_PREVIOUS_HASH.to_string()),
        };

        let mut record = DonationRecord {
            sequence_number,
            hash: String::new(),
            previous_hash,
            donation_id: self.parts.ids.next_id(DONATION_PREFIX),
            donor_id: donation.donor_id.clone(),
            donor_name: donation.public_donor_name(),
            beneficiary_id: donation.beneficiary_id.clone(),
            request_id: donation.request_id.clone(),
            amount: recorded,
            donation_type: donation.donation_type,
            purpose: donation.purpose.clone(),
            timestamp: self.parts.clock.now(),
            confirmations: 1,
            signature: None,
        };
        record.hash = compute_hash(&record);
        if let Some(keypair) = &self.parts.keypair {
            record.signature = Some(keypair.sign_hash(&record.hash));
        }

        self.parts.storage.append(&record)?;

        let fulfilled = request.fulfilled_amount + recorded;
        if let Err(e) = self
            .parts
            .requests
            .update_fulfilled(&request.id, fulfilled, record.timestamp)
        {
            // The entry is already in the chain; the fulfilled total can be
            // rebuilt from it with Ledger::fulfilled_from_ledger
            tracing::error!(
                request_id = %request.id,
                sequence = record.sequence_number,
                "Entry appended but fulfilled amount not updated: {}",
                e
            );
            return Err(e);
        }

        tracing::info!(
            sequence = record.sequence_number,
            donation_id = %record.donation_id,
            request_id = %record.request_id,
            amount = %record.amount,
            donation_type = %record.donation_type,
            "Donation appended"
        );

        Ok(DonationReceipt {
            donation_record: record,
            unallocated,
        })
    }

    fn check_acceptance(&self, donation: &NewDonation, request: &AidRequest) -> Result<()> {
        if request.beneficiary_id != donation.beneficiary_id {
            return Err(Error::validation(format!(
                "request {} does not belong to beneficiary {}",
                request.id, donation.beneficiary_id
            )));
        }

        if request.status == RequestStatus::Rejected {
            return Err(Error::validation(format!(
                "request {} was rejected and cannot receive donations",
                request.id
            )));
        }

        if self.policy.enforce_donation_category
            && !request.eligibility.accepts(donation.donation_type)
        {
            return Err(Error::validation(format!(
                "request {} is {}-only and cannot receive {}",
                request.id, request.eligibility, donation.donation_type
            )));
        }

        Ok(())
    }

    /// Amount to record and amount left over
    fn apply_funding_policy(
        &self,
        donation: &NewDonation,
        request: &AidRequest,
    ) -> Result<(Decimal, Decimal)> {
        let remaining = request.remaining();
        if donation.amount <= remaining {
            return Ok((donation.amount, Decimal::ZERO));
        }

        match self.policy.funding_policy {
            FundingPolicy::Cap if remaining > Decimal::ZERO => {
                Ok((remaining, donation.amount - remaining))
            }
            _ => Err(Error::OverFunded {
                requested: donation.amount,
                remaining,
            }),
        }
    }

    fn self_check_tail(&self, tail: &DonationRecord) -> Result<()> {
        let len = self.parts.storage.len()?;
        if tail.sequence_number + 1 != len {
            return Err(Error::ChainIntegrity {
                index: tail.sequence_number,
                reason: format!("tail sequence {} with {} entries", tail.sequence_number, len),
            });
        }
        if compute_hash(tail) != tail.hash {
            return Err(Error::ChainIntegrity {
                index: tail.sequence_number,
                reason: "tail hash does not match content".to_string(),
            });
        }
        Ok(())
    }

    fn donor_entries(&self, donor_id: &str) -> Result<Vec<DonationRecord>> {
        let tail_sequence = self.parts.storage.tail()?.map(|tail| tail.sequence_number);
        let mut entries = self.parts.storage.entries_by_donor(donor_id)?;
        if let Some(tail_sequence) = tail_sequence {
            for entry in &mut entries {
                entry.confirmations = confirmations(tail_sequence, entry.sequence_number);
            }
        }
        Ok(entries)
    }

    fn verify(&mut self) -> Result<ChainVerification> {
        let entries = self.parts.storage.entries()?;
        // Also seeds the gauge for a chain reopened from storage
        self.parts.metrics.ledger_entries.set(entries.len() as i64);
        let verification = match &self.parts.keypair {
            Some(keypair) => chain::verify_signatures(&entries, &keypair.public_key()),
            None => chain::verify_chain(&entries),
        };

        if !verification.valid {
            self.parts.metrics.record_verification_failure();
            self.halt(format!(
                "verification failed at entry {}: {}",
                verification.first_invalid_index.unwrap_or_default(),
                verification.reason.as_deref().unwrap_or("unknown")
            ));
        }

        Ok(verification)
    }

    fn status(&self) -> Result<LedgerStatus> {
        let tail = self.parts.storage.tail()?;
        Ok(LedgerStatus {
            entries: tail.as_ref().map_or(0, |t| t.sequence_number + 1),
            tail_hash: tail.map(|t| t.hash),
            halted: self.halted.clone(),
        })
    }

    fn halt(&mut self, reason: String) {
        if self.halted.is_none() {
            tracing::error!(reason = %reason, "Ledger halted; refusing further appends");
            self.halted = Some(reason);
        }
    }
}

/// Fill in confirmations as depth below the tail
fn with_confirmations(mut entries: Vec<DonationRecord>) -> Vec<DonationRecord> {
    if let Some(tail_sequence) = entries.last().map(|tail| tail.sequence_number) {
        for entry in &mut entries {
            entry.confirmations = confirmations(tail_sequence, entry.sequence_number);
        }
    }
    entries
}

/// Depth of an entry below the tail, counting itself
///
/// Saturates so an out-of-order log (which fails verification) still reads.
fn confirmations(tail_sequence: u64, sequence_number: u64) -> u64 {
    tail_sequence.saturating_sub(sequence_number) + 1
}

fn rejection_label(error: &Error) -> &'static str {
    match error {
        Error::Validation(_) => "validation",
        Error::NotFound(_) => "not_found",
        Error::OverFunded { .. } => "over_funded",
        Error::LedgerHalted => "halted",
        Error::ChainIntegrity { .. } => "integrity",
        _ => "storage",
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Append a donation
    pub async fn append_donation(&self, donation: NewDonation) -> Result<DonationReceipt> {
        self.call(|response| LedgerMessage::AppendDonation { donation, response })
            .await
    }

    /// All entries
    pub async fn entries(&self) -> Result<Vec<DonationRecord>> {
        self.call(|response| LedgerMessage::GetEntries { response })
            .await
    }

    /// Entries made by one donor
    pub async fn donor_entries(&self, donor_id: impl Into<String>) -> Result<Vec<DonationRecord>> {
        let donor_id = donor_id.into();
        self.call(|response| LedgerMessage::GetDonorEntries { donor_id, response })
            .await
    }

    /// Verify the whole chain
    pub async fn verify(&self) -> Result<ChainVerification> {
        self.call(|response| LedgerMessage::Verify { response })
            .await
    }

    /// Head of the ledger
    pub async fn status(&self) -> Result<LedgerStatus> {
        self.call(|response| LedgerMessage::GetStatus { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    parts: ActorParts,
    policy: AppendPolicy,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let actor = LedgerActor::new(parts, rx, policy);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FixedClock, SequentialIdGenerator};
    use crate::requests::MemoryRequestStore;
    use crate::storage::MemoryLedgerStorage;
    use crate::types::{DonationType, Eligibility, NeedType};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn seeded_requests() -> Arc<MemoryRequestStore> {
        let store = Arc::new(MemoryRequestStore::new());
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        store
            .create(AidRequest {
                id: "req-1".to_string(),
                beneficiary_id: "ben-1".to_string(),
                amount: dec!(100),
                purpose: "Groceries".to_string(),
                description: "Food for the family".to_string(),
                category: "food".to_string(),
                need_type: NeedType::Essential,
                is_urgent: true,
                monthly_income: Some(dec!(400)),
                dependents: Some(3),
                has_assets: Some(false),
                eligibility: Eligibility::Zakah,
                status: RequestStatus::Approved,
                rejection_reason: None,
                fulfilled_amount: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        store
    }

    fn spawn(storage: Arc<MemoryLedgerStorage>, requests: Arc<MemoryRequestStore>) -> LedgerHandle {
        spawn_with_metrics(storage, requests, Metrics::new().unwrap())
    }

    fn spawn_with_metrics(
        storage: Arc<MemoryLedgerStorage>,
        requests: Arc<MemoryRequestStore>,
        metrics: Metrics,
    ) -> LedgerHandle {
        let parts = ActorParts {
            storage,
            requests,
            ids: Arc::new(SequentialIdGenerator::new()),
            clock: Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
            )),
            keypair: None,
            metrics,
        };
        let policy = AppendPolicy {
            funding_policy: FundingPolicy::Reject,
            enforce_donation_category: true,
        };
        spawn_ledger_actor(parts, policy, 16)
    }

    fn donation(amount: Decimal) -> NewDonation {
        NewDonation {
            donor_id: "donor-1".to_string(),
            donor_name: Some("Maryam".to_string()),
            is_anonymous: false,
            beneficiary_id: "ben-1".to_string(),
            request_id: "req-1".to_string(),
            amount,
            donation_type: DonationType::Zakah,
            purpose: "Groceries".to_string(),
        }
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let handle = spawn(Arc::new(MemoryLedgerStorage::new()), seeded_requests());
        let status = handle.status().await.unwrap();
        assert_eq!(status.entries, 0);
        assert!(status.halted.is_none());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_append_links_entries() {
        let requests = seeded_requests();
        let handle = spawn(Arc::new(MemoryLedgerStorage::new()), requests.clone());

        let first = handle.append_donation(donation(dec!(30))).await.unwrap();
        let second = handle.append_donation(donation(dec!(20))).await.unwrap();

        assert_eq!(first.donation_record.sequence_number, 0);
        assert_eq!(first.donation_record.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(second.donation_record.previous_hash, first.donation_record.hash);
        assert_eq!(second.donation_record.confirmations, 1);
        assert_eq!(requests.get("req-1").unwrap().fulfilled_amount, dec!(50));

        let entries = handle.entries().await.unwrap();
        assert_eq!(entries[0].confirmations, 2);
        assert_eq!(entries[1].confirmations, 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_rejects_sadaqah_only_for_zakah() {
        let requests = seeded_requests();
        requests
            .create(AidRequest {
                id: "req-2".to_string(),
                eligibility: Eligibility::Sadaqah,
                ..requests.get("req-1").unwrap()
            })
            .unwrap();
        let handle = spawn(Arc::new(MemoryLedgerStorage::new()), requests);

        let mut gift = donation(dec!(10));
        gift.request_id = "req-2".to_string();
        let err = handle.append_donation(gift.clone()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        gift.donation_type = DonationType::Sadaqah;
        assert!(handle.append_donation(gift).await.is_ok());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_halts_on_corrupt_startup_chain() {
        let requests = seeded_requests();
        let good = spawn(Arc::new(MemoryLedgerStorage::new()), requests.clone());
        good.append_donation(donation(dec!(10))).await.unwrap();
        let mut entries = good.entries().await.unwrap();
        good.shutdown().await.unwrap();

        entries[0].amount = dec!(99);
        let handle = spawn(
            Arc::new(MemoryLedgerStorage::with_entries(entries)),
            requests,
        );

        let status = handle.status().await.unwrap();
        assert!(status.halted.is_some());

        let err = handle.append_donation(donation(dec!(5))).await.unwrap_err();
        assert!(matches!(err, Error::LedgerHalted));

        handle.shutdown().await.unwrap();
    }

    async fn appended_entries(requests: Arc<MemoryRequestStore>, count: usize) -> Vec<DonationRecord> {
        let handle = spawn(Arc::new(MemoryLedgerStorage::new()), requests);
        for _ in 0..count {
            handle.append_donation(donation(dec!(10))).await.unwrap();
        }
        let entries = handle.entries().await.unwrap();
        handle.shutdown().await.unwrap();
        entries
    }

    #[tokio::test]
    async fn test_out_of_order_log_still_serves_reads() {
        let requests = seeded_requests();
        let mut entries = appended_entries(requests.clone(), 3).await;
        entries.swap(1, 2);

        let handle = spawn(
            Arc::new(MemoryLedgerStorage::with_entries(entries)),
            requests,
        );
        assert!(handle.status().await.unwrap().halted.is_some());

        let history = handle.donor_entries("donor-1").await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|entry| entry.confirmations >= 1));

        // Actor is still alive after the read
        assert_eq!(handle.entries().await.unwrap().len(), 3);
        assert!(handle.status().await.unwrap().halted.is_some());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reopened_chain_seeds_entry_gauge() {
        let requests = seeded_requests();
        let entries = appended_entries(requests.clone(), 2).await;

        let metrics = Metrics::new().unwrap();
        let handle = spawn_with_metrics(
            Arc::new(MemoryLedgerStorage::with_entries(entries)),
            requests,
            metrics.clone(),
        );

        // Startup verification runs before the first message
        assert_eq!(handle.status().await.unwrap().entries, 2);
        assert_eq!(metrics.ledger_entries.get(), 2);

        handle.shutdown().await.unwrap();
    }

    #[test]
    fn test_confirmations_saturate() {
        assert_eq!(confirmations(4, 4), 1);
        assert_eq!(confirmations(4, 0), 5);
        assert_eq!(confirmations(1, 2), 1);
        assert!(with_confirmations(Vec::new()).is_empty());
    }
}
