//! Ledger storage backends
//!
//! Storage is dumb: it keeps entries in sequence order and refuses any write
//! that is not exactly the next sequence number. Hashing and linkage are the
//! actor's job; storage only guards against a second writer.
//!
//! # Backends
//!
//! - [`MemoryLedgerStorage`] - process-lifetime vector
//! - `RocksLedgerStorage` - RocksDB, behind the `rocksdb` feature
//!   - `entries` column family (key: sequence number, big-endian)
//!   - `indices` column family (key: donor_id || 0x00 || sequence number)

use crate::{types::DonationRecord, Error, Result};
use parking_lot::RwLock;

/// Ordered, append-only entry store
pub trait LedgerStorage: Send + Sync {
    /// Append the next entry; its sequence number must equal `len()`
    fn append(&self, record: &DonationRecord) -> Result<()>;

    /// Last entry, if any
    fn tail(&self) -> Result<Option<DonationRecord>>;

    /// All entries in sequence order
    fn entries(&self) -> Result<Vec<DonationRecord>>;

    /// Number of entries
    fn len(&self) -> Result<u64>;

    /// Whether the ledger is empty
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Entries made by one donor, in sequence order
    fn entries_by_donor(&self, donor_id: &str) -> Result<Vec<DonationRecord>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| entry.donor_id == donor_id)
            .collect())
    }
}

fn check_next_sequence(record: &DonationRecord, len: u64) -> Result<()> {
    if record.sequence_number != len {
        return Err(Error::ChainIntegrity {
            index: record.sequence_number,
            reason: format!(
                "write of sequence {} while ledger holds {} entries",
                record.sequence_number, len
            ),
        });
    }
    Ok(())
}

/// In-memory ledger storage
#[derive(Debug, Default)]
pub struct MemoryLedgerStorage {
    entries: RwLock<Vec<DonationRecord>>,
}

impl MemoryLedgerStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage preloaded with entries, e.g. a log restored from elsewhere
    pub fn with_entries(entries: Vec<DonationRecord>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl LedgerStorage for MemoryLedgerStorage {
    fn append(&self, record: &DonationRecord) -> Result<()> {
        let mut entries = self.entries.write();
        check_next_sequence(record, entries.len() as u64)?;
        entries.push(record.clone());

        tracing::debug!(
            sequence = record.sequence_number,
            donation_id = %record.donation_id,
            "Entry appended"
        );

        Ok(())
    }

    fn tail(&self) -> Result<Option<DonationRecord>> {
        Ok(self.entries.read().last().cloned())
    }

    fn entries(&self) -> Result<Vec<DonationRecord>> {
        Ok(self.entries.read().clone())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.entries.read().len() as u64)
    }
}

#[cfg(feature = "rocksdb")]
pub use self::rocks::RocksLedgerStorage;

#[cfg(feature = "rocksdb")]
mod rocks {
    use super::{check_next_sequence, LedgerStorage};
    use crate::{types::DonationRecord, Error, Result};
    use parking_lot::Mutex;
    use rocksdb::{
        ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB,
    };
    use std::path::Path;

    /// Column family names
    const CF_ENTRIES: &str = "entries";
    const CF_INDICES: &str = "indices";

    /// RocksDB-backed ledger storage
    pub struct RocksLedgerStorage {
        db: DB,
        // Serializes the length check with the write
        write_lock: Mutex<()>,
    }

    impl std::fmt::Debug for RocksLedgerStorage {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RocksLedgerStorage")
                .field("path", &self.db.path())
                .finish()
        }
    }

    impl RocksLedgerStorage {
        /// Open or create database
        pub fn open(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            std::fs::create_dir_all(path)?;

            let mut db_opts = Options::default();
            db_opts.create_if_missing(true);
            db_opts.create_missing_column_families(true);

            let cf_descriptors = vec![
                ColumnFamilyDescriptor::new(CF_ENTRIES, Self::cf_options_entries()),
                ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
            ];

            let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

            tracing::info!(path = ?path, "Opened RocksDB ledger storage");

            Ok(Self {
                db,
                write_lock: Mutex::new(()),
            })
        }

        fn cf_options_entries() -> Options {
            let mut opts = Options::default();
            opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
            opts
        }

        fn cf_options_indices() -> Options {
            let mut opts = Options::default();
            opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
            let mut block_opts = rocksdb::BlockBasedOptions::default();
            block_opts.set_bloom_filter(10.0, false);
            opts.set_block_based_table_factory(&block_opts);
            opts
        }

        fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
            self.db
                .cf_handle(name)
                .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
        }

        fn donor_index_key(donor_id: &str, sequence: u64) -> Vec<u8> {
            let mut key = Vec::with_capacity(donor_id.len() + 9);
            key.extend_from_slice(donor_id.as_bytes());
            key.push(0);
            key.extend_from_slice(&sequence.to_be_bytes());
            key
        }

        fn decode(value: &[u8]) -> Result<DonationRecord> {
            Ok(serde_json::from_slice(value)?)
        }
    }

    impl LedgerStorage for RocksLedgerStorage {
        fn append(&self, record: &DonationRecord) -> Result<()> {
            let _guard = self.write_lock.lock();
            check_next_sequence(record, self.len()?)?;

            let cf_entries = self.cf_handle(CF_ENTRIES)?;
            let cf_indices = self.cf_handle(CF_INDICES)?;

            let mut batch = WriteBatch::default();
            batch.put_cf(
                cf_entries,
                record.sequence_number.to_be_bytes(),
                serde_json::to_vec(record)?,
            );
            batch.put_cf(
                cf_indices,
                Self::donor_index_key(&record.donor_id, record.sequence_number),
                b"",
            );
            self.db.write(batch)?;

            tracing::debug!(
                sequence = record.sequence_number,
                donation_id = %record.donation_id,
                "Entry persisted"
            );

            Ok(())
        }

        fn tail(&self) -> Result<Option<DonationRecord>> {
            let cf = self.cf_handle(CF_ENTRIES)?;
            match self.db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (_, value) = item?;
                    Ok(Some(Self::decode(&value)?))
                }
                None => Ok(None),
            }
        }

        fn entries(&self) -> Result<Vec<DonationRecord>> {
            let cf = self.cf_handle(CF_ENTRIES)?;
            let mut entries = Vec::new();
            for item in self.db.iterator_cf(cf, IteratorMode::Start) {
                let (_, value) = item?;
                entries.push(Self::decode(&value)?);
            }
            Ok(entries)
        }

        fn len(&self) -> Result<u64> {
            Ok(self.tail()?.map_or(0, |tail| tail.sequence_number + 1))
        }

        fn entries_by_donor(&self, donor_id: &str) -> Result<Vec<DonationRecord>> {
            let cf_indices = self.cf_handle(CF_INDICES)?;
            let cf_entries = self.cf_handle(CF_ENTRIES)?;

            let mut prefix = donor_id.as_bytes().to_vec();
            prefix.push(0);

            let mut entries = Vec::new();
            for item in self.db.prefix_iterator_cf(cf_indices, &prefix) {
                let (key, _) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                let sequence = &key[prefix.len()..];
                let value = self.db.get_cf(cf_entries, sequence)?.ok_or_else(|| {
                    Error::Storage(format!("index points at missing entry for {}", donor_id))
                })?;
                entries.push(Self::decode(&value)?);
            }
            Ok(entries)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::chain::compute_hash;
        use crate::types::{DonationType, GENESIS_PREVIOUS_HASH};
        use chrono::Utc;
        use rust_decimal_macros::dec;

        fn record(sequence: u64, donor_id: &str, previous_hash: &str) -> DonationRecord {
            let mut record = DonationRecord {
                sequence_number: sequence,
                hash: String::new(),
                previous_hash: previous_hash.to_string(),
                donation_id: format!("don-{}", sequence),
                donor_id: donor_id.to_string(),
                donor_name: "Anonymous".to_string(),
                beneficiary_id: "ben-1".to_string(),
                request_id: "req-1".to_string(),
                amount: dec!(10),
                donation_type: DonationType::Sadaqah,
                purpose: "Food".to_string(),
                timestamp: Utc::now(),
                confirmations: 1,
                signature: None,
            };
            record.hash = compute_hash(&record);
            record
        }

        #[test]
        fn test_rocks_append_and_reopen() {
            let temp_dir = tempfile::tempdir().unwrap();

            {
                let storage = RocksLedgerStorage::open(temp_dir.path()).unwrap();
                let first = record(0, "don-a", GENESIS_PREVIOUS_HASH);
                storage.append(&first).unwrap();
                storage.append(&record(1, "don-b", &first.hash)).unwrap();
                assert_eq!(storage.len().unwrap(), 2);
            }

            let storage = RocksLedgerStorage::open(temp_dir.path()).unwrap();
            let entries = storage.entries().unwrap();
            assert_eq!(entries.len(), 2);
            assert!(crate::chain::verify(&entries));
            assert_eq!(storage.tail().unwrap().unwrap().sequence_number, 1);
            assert_eq!(storage.entries_by_donor("don-b").unwrap().len(), 1);
        }

        #[test]
        fn test_rocks_rejects_out_of_order_write() {
            let temp_dir = tempfile::tempdir().unwrap();
            let storage = RocksLedgerStorage::open(temp_dir.path()).unwrap();
            let err = storage
                .append(&record(3, "don-a", GENESIS_PREVIOUS_HASH))
                .unwrap_err();
            assert!(matches!(err, Error::ChainIntegrity { .. }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::compute_hash;
    use crate::types::{DonationType, GENESIS_PREVIOUS_HASH};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(sequence: u64, donor_id: &str) -> DonationRecord {
        let mut record = DonationRecord {
            sequence_number: sequence,
            hash: String::new(),
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            donation_id: format!("don-{}", sequence),
            donor_id: donor_id.to_string(),
            donor_name: "Anonymous".to_string(),
            beneficiary_id: "ben-1".to_string(),
            request_id: "req-1".to_string(),
            amount: dec!(10),
            donation_type: DonationType::Zakah,
            purpose: "Food".to_string(),
            timestamp: Utc::now(),
            confirmations: 1,
            signature: None,
        };
        record.hash = compute_hash(&record);
        record
    }

    #[test]
    fn test_memory_append_and_tail() {
        let storage = MemoryLedgerStorage::new();
        assert!(storage.is_empty().unwrap());
        assert!(storage.tail().unwrap().is_none());

        storage.append(&record(0, "don-a")).unwrap();
        storage.append(&record(1, "don-b")).unwrap();

        assert_eq!(storage.len().unwrap(), 2);
        assert_eq!(storage.tail().unwrap().unwrap().sequence_number, 1);
        assert_eq!(storage.entries_by_donor("don-a").unwrap().len(), 1);
    }

    #[test]
    fn test_memory_rejects_second_writer() {
        let storage = MemoryLedgerStorage::new();
        storage.append(&record(0, "don-a")).unwrap();

        // A stale writer that also read an empty tail
        let err = storage.append(&record(0, "don-b")).unwrap_err();
        assert!(matches!(err, Error::ChainIntegrity { index: 0, .. }));
        assert_eq!(storage.len().unwrap(), 1);
    }
}
