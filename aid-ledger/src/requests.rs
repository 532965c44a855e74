//! Aid request store
//!
//! The ledger never reaches into process-wide state; it talks to whatever
//! [`RequestStore`] it was given. [`MemoryRequestStore`] keeps everything for
//! the lifetime of the process.

use crate::{
    types::{AidRequest, RequestStatus},
    Error, Result,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Persistence boundary for aid requests
pub trait RequestStore: Send + Sync {
    /// Store a new request; fails if the id is taken
    fn create(&self, request: AidRequest) -> Result<AidRequest>;

    /// Fetch a request by id
    fn get(&self, id: &str) -> Result<AidRequest>;

    /// Overwrite the fulfilled amount
    fn update_fulfilled(
        &self,
        id: &str,
        fulfilled_amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<AidRequest>;

    /// Record a review outcome
    fn update_status(
        &self,
        id: &str,
        status: RequestStatus,
        rejection_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<AidRequest>;

    /// Requests owned by a beneficiary, oldest first
    fn list_by_beneficiary(&self, beneficiary_id: &str) -> Result<Vec<AidRequest>>;

    /// Every request, oldest first
    fn list(&self) -> Result<Vec<AidRequest>>;
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<String, AidRequest>,
    order: Vec<String>,
}

/// In-memory request store
#[derive(Debug, Default)]
pub struct MemoryRequestStore {
    inner: RwLock<Inner>,
}

impl MemoryRequestStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestStore for MemoryRequestStore {
    fn create(&self, request: AidRequest) -> Result<AidRequest> {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&request.id) {
            return Err(Error::validation(format!(
                "request {} already exists",
                request.id
            )));
        }

        inner.order.push(request.id.clone());
        inner.by_id.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn get(&self, id: &str) -> Result<AidRequest> {
        self.inner
            .read()
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn update_fulfilled(
        &self,
        id: &str,
        fulfilled_amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<AidRequest> {
        let mut inner = self.inner.write();
        let request = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if fulfilled_amount < Decimal::ZERO || fulfilled_amount > request.amount {
            return Err(Error::validation(format!(
                "fulfilled amount {} outside 0..={} for request {}",
                fulfilled_amount, request.amount, id
            )));
        }

        request.fulfilled_amount = fulfilled_amount;
        request.updated_at = at;
        Ok(request.clone())
    }

    fn update_status(
        &self,
        id: &str,
        status: RequestStatus,
        rejection_reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<AidRequest> {
        let mut inner = self.inner.write();
        let request = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        request.status = status;
        request.rejection_reason = rejection_reason;
        request.updated_at = at;
        Ok(request.clone())
    }

    fn list_by_beneficiary(&self, beneficiary_id: &str) -> Result<Vec<AidRequest>> {
        let inner = self.inner.read();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .filter(|request| request.beneficiary_id == beneficiary_id)
            .cloned()
            .collect())
    }

    fn list(&self) -> Result<Vec<AidRequest>> {
        let inner = self.inner.read();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Eligibility, NeedType};
    use rust_decimal_macros::dec;

    fn request(id: &str, beneficiary_id: &str) -> AidRequest {
        let now = Utc::now();
        AidRequest {
            id: id.to_string(),
            beneficiary_id: beneficiary_id.to_string(),
            amount: dec!(300),
            purpose: "Rent assistance".to_string(),
            description: "Rent for this month".to_string(),
            category: "housing".to_string(),
            need_type: NeedType::Housing,
            is_urgent: false,
            monthly_income: None,
            dependents: None,
            has_assets: None,
            eligibility: Eligibility::Both,
            status: RequestStatus::Pending,
            rejection_reason: None,
            fulfilled_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = MemoryRequestStore::new();
        store.create(request("req-1", "ben-1")).unwrap();

        let fetched = store.get("req-1").unwrap();
        assert_eq!(fetched.beneficiary_id, "ben-1");
        assert!(matches!(store.get("req-404"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = MemoryRequestStore::new();
        store.create(request("req-1", "ben-1")).unwrap();
        assert!(matches!(
            store.create(request("req-1", "ben-2")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_update_fulfilled_bounds() {
        let store = MemoryRequestStore::new();
        store.create(request("req-1", "ben-1")).unwrap();

        let updated = store.update_fulfilled("req-1", dec!(120), Utc::now()).unwrap();
        assert_eq!(updated.fulfilled_amount, dec!(120));
        assert_eq!(updated.remaining(), dec!(180));

        assert!(store.update_fulfilled("req-1", dec!(301), Utc::now()).is_err());
        assert!(store.update_fulfilled("req-1", dec!(-1), Utc::now()).is_err());
        assert_eq!(store.get("req-1").unwrap().fulfilled_amount, dec!(120));
    }

    #[test]
    fn test_update_status() {
        let store = MemoryRequestStore::new();
        store.create(request("req-1", "ben-1")).unwrap();

        let updated = store
            .update_status(
                "req-1",
                RequestStatus::Rejected,
                Some("Incomplete documents".to_string()),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(updated.status, RequestStatus::Rejected);
        assert_eq!(updated.rejection_reason.as_deref(), Some("Incomplete documents"));
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = MemoryRequestStore::new();
        store.create(request("req-b", "ben-1")).unwrap();
        store.create(request("req-a", "ben-2")).unwrap();
        store.create(request("req-c", "ben-1")).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["req-b", "req-a", "req-c"]);

        let mine: Vec<String> = store
            .list_by_beneficiary("ben-1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(mine, vec!["req-b", "req-c"]);
    }
}
