//! Hash chaining and verification for donation records
//!
//! An entry's hash is `sha256(canonical_json(content) ++ previous_hash)`,
//! hex encoded. The canonical form is compact JSON with sorted camelCase keys,
//! decimals as strings and timestamps as RFC 3339 UTC with nanoseconds, so any
//! implementation can recompute it byte for byte.
//!
//! `hash`, `confirmations` and `signature` are not part of the content.

use crate::{
    crypto::{sha256_hex, verify_hash_signature},
    types::{DonationRecord, GENESIS_PREVIOUS_HASH},
    Error,
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Canonical bytes of an entry's content (everything but the hash)
pub fn canonical_content(record: &DonationRecord) -> String {
    let mut content: BTreeMap<&'static str, Value> = BTreeMap::new();
    content.insert("amount", Value::String(record.amount.to_string()));
    content.insert("beneficiaryId", Value::String(record.beneficiary_id.clone()));
    content.insert("donationId", Value::String(record.donation_id.clone()));
    content.insert(
        "donationType",
        Value::String(record.donation_type.as_str().to_string()),
    );
    content.insert("donorId", Value::String(record.donor_id.clone()));
    content.insert("donorName", Value::String(record.donor_name.clone()));
    content.insert("previousHash", Value::String(record.previous_hash.clone()));
    content.insert("purpose", Value::String(record.purpose.clone()));
    content.insert("requestId", Value::String(record.request_id.clone()));
    content.insert("sequenceNumber", Value::from(record.sequence_number));
    content.insert(
        "timestamp",
        Value::String(
            record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        ),
    );

    // BTreeMap keys serialize in order; a map of strings cannot fail
    Value::Object(content.into_iter().map(|(k, v)| (k.to_string(), v)).collect()).to_string()
}

/// Compute the hash an entry should carry
pub fn compute_hash(record: &DonationRecord) -> String {
    let mut preimage = canonical_content(record);
    preimage.push_str(&record.previous_hash);
    sha256_hex(preimage.as_bytes())
}

/// Outcome of a chain verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    /// Whether every entry passed
    pub valid: bool,

    /// Index of the first failing entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_invalid_index: Option<u64>,

    /// Why that entry failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Number of entries checked
    pub entries_checked: u64,
}

impl ChainVerification {
    fn passed(entries_checked: u64) -> Self {
        Self {
            valid: true,
            first_invalid_index: None,
            reason: None,
            entries_checked,
        }
    }

    fn failed(index: usize, reason: String) -> Self {
        Self {
            valid: false,
            first_invalid_index: Some(index as u64),
            reason: Some(reason),
            entries_checked: index as u64 + 1,
        }
    }

    /// Convert a failed verification into an error
    pub fn into_result(self) -> crate::Result<Self> {
        match (self.valid, self.first_invalid_index) {
            (false, Some(index)) => Err(Error::ChainIntegrity {
                index,
                reason: self.reason.unwrap_or_default(),
            }),
            _ => Ok(self),
        }
    }
}

/// Check a single entry against its predecessor
///
/// `index` is the entry's position in the sequence being verified.
pub fn check_entry(
    index: usize,
    entry: &DonationRecord,
    previous: Option<&DonationRecord>,
) -> std::result::Result<(), String> {
    if entry.sequence_number != index as u64 {
        return Err(format!(
            "sequence number {} at position {}",
            entry.sequence_number, index
        ));
    }

    let expected_previous = previous.map_or(GENESIS_PREVIOUS_HASH, |prev| prev.hash.as_str());
    if entry.previous_hash != expected_previous {
        return Err(match previous {
            Some(_) => "previous hash does not match prior entry".to_string(),
            None => "genesis entry does not carry the sentinel previous hash".to_string(),
        });
    }

    if compute_hash(entry) != entry.hash {
        return Err("stored hash does not match content".to_string());
    }

    Ok(())
}

/// Verify a full sequence, reporting the first failure
pub fn verify_chain(entries: &[DonationRecord]) -> ChainVerification {
    let mut previous = None;
    for (index, entry) in entries.iter().enumerate() {
        if let Err(reason) = check_entry(index, entry, previous) {
            return ChainVerification::failed(index, reason);
        }
        previous = Some(entry);
    }

    ChainVerification::passed(entries.len() as u64)
}

/// Whether a sequence is an untampered chain
pub fn verify(entries: &[DonationRecord]) -> bool {
    verify_chain(entries).valid
}

/// Verify the chain and every entry's signature
pub fn verify_signatures(entries: &[DonationRecord], public_key: &[u8; 32]) -> ChainVerification {
    let chain = verify_chain(entries);
    if !chain.valid {
        return chain;
    }

    for (index, entry) in entries.iter().enumerate() {
        let signed = entry
            .signature
            .as_deref()
            .map_or(false, |sig| verify_hash_signature(&entry.hash, sig, public_key));
        if !signed {
            return ChainVerification::failed(index, "missing or invalid signature".to_string());
        }
    }

    chain
}
