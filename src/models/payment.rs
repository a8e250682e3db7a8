use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
}

/// A payment transaction tracked against the external provider
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    /// Server-generated reference; primary key and provider lookup key
    pub reference: String,
    /// Paying user
    pub user_id: String,
    /// Email sent to the provider
    pub email: String,
    /// Amount in minor currency units
    pub amount: i64,
    /// ISO currency code
    pub currency: String,
    pub status: PaymentStatus,
    /// Reference echoed back by the provider on verification
    #[serde(default)]
    pub provider_reference: Option<String>,
    /// Unix millis of record creation
    pub created_at: i64,
    /// Unix millis of successful verification
    #[serde(default)]
    pub verified_at: Option<i64>,
}

impl Payment {
    pub fn new(
        reference: String,
        user_id: String,
        email: String,
        amount: i64,
        currency: String,
        now_millis: i64,
    ) -> Self {
        Self {
            reference,
            user_id,
            email,
            amount,
            currency,
            status: PaymentStatus::Pending,
            provider_reference: None,
            created_at: now_millis,
            verified_at: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == PaymentStatus::Success
    }
}
