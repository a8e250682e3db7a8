use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Client for the external payment provider's verification API
pub struct PaymentClient {
    client: reqwest::Client,
    endpoint: String,
    secret_key: String,
}

/// Envelope the provider wraps every response in
#[derive(Debug, Deserialize)]
pub struct ProviderResponse {
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<ProviderTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderTransaction {
    /// Transaction state as reported by the provider ("success", "failed", ...)
    pub status: String,
    pub reference: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
}

impl PaymentClient {
    pub fn new(endpoint: String, secret_key: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            secret_key,
        })
    }

    /// Look up a transaction by reference.
    ///
    /// Returns the provider's view of the transaction; deciding whether its
    /// status constitutes a verified payment is up to the caller.
    pub async fn verify_transaction(&self, reference: &str) -> Result<ProviderTransaction> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.endpoint.trim_end_matches('/'),
            reference
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("Failed to reach payment provider")?;

        if !response.status().is_success() {
            bail!(
                "Payment provider returned error status: {}",
                response.status()
            );
        }

        let body = response
            .json::<ProviderResponse>()
            .await
            .context("Failed to parse payment provider response")?;

        match body.data {
            Some(transaction) => Ok(transaction),
            None => bail!(
                "Payment provider response had no transaction data: {}",
                body.message.unwrap_or_default()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_client_creation() {
        let client = PaymentClient::new(
            "https://api.paystack.co".to_string(),
            "sk_test_key".to_string(),
            10,
        );
        assert!(client.is_ok());
    }

    #[test]
    fn test_provider_response_deserialization() {
        let json = r#"{
            "status": true,
            "message": "Verification successful",
            "data": {
                "status": "success",
                "reference": "rs_u1_1700000000000_a1b2c3d4",
                "amount": 50000,
                "currency": "NGN"
            }
        }"#;

        let response: ProviderResponse = serde_json::from_str(json).unwrap();
        assert!(response.status);
        let data = response.data.unwrap();
        assert_eq!(data.status, "success");
        assert_eq!(data.amount, 50000);
        assert_eq!(data.currency, "NGN");
    }

    #[test]
    fn test_provider_response_without_data() {
        let json = r#"{"status": false, "message": "Transaction not found"}"#;
        let response: ProviderResponse = serde_json::from_str(json).unwrap();
        assert!(!response.status);
        assert!(response.data.is_none());
    }
}
