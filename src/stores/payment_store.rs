use crate::models::payment::Payment;
use dashmap::DashMap;

/// In-memory document store for payment records, keyed by reference
pub struct PaymentStore {
    payments: DashMap<String, Payment>,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self {
            payments: DashMap::new(),
        }
    }

    /// Insert or replace a payment record
    pub fn upsert(&self, payment: Payment) {
        self.payments.insert(payment.reference.clone(), payment);
    }

    /// Point read; returns a clone of the record if found
    pub fn get(&self, reference: &str) -> Option<Payment> {
        self.payments.get(reference).map(|entry| entry.value().clone())
    }

    /// Apply a mutation under the payment entry's write lock.
    /// Returns None if the reference is unknown.
    pub fn with_payment<T, F>(&self, reference: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut Payment) -> T,
    {
        let mut entry = self.payments.get_mut(reference)?;
        Some(f(entry.value_mut()))
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }
}

impl Default for PaymentStore {
    fn default() -> Self {
        Self::new()
    }
}
