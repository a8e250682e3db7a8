use crate::core::config::AuthConfig;
use crate::core::error::LedgerError;
use axum::http::HeaderMap;

pub const HEADER_AUTH_KEY: &str = "x-auth-key";
pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_EMAIL: &str = "x-user-email";
pub const HEADER_EMAIL_VERIFIED: &str = "x-email-verified";

/// Identity forwarded by the authenticating gateway
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
}

/// Verify a shared secret using constant-time comparison to prevent timing
/// attacks that could be used to guess the key character by character.
pub fn verify_shared_key(provided: &str, expected: &str) -> bool {
    provided.as_bytes().len() == expected.as_bytes().len()
        && provided
            .as_bytes()
            .iter()
            .zip(expected.as_bytes().iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Extract the authenticated identity from gateway headers.
///
/// The gateway has already validated the caller's token; this service only
/// checks the shared gateway secret and that the forwarded identity is
/// complete and email-verified. All failures are `Unauthenticated` before
/// any state is touched.
pub fn authenticate(headers: &HeaderMap, config: &AuthConfig) -> Result<AuthContext, LedgerError> {
    let provided_key = header_str(headers, HEADER_AUTH_KEY).ok_or(LedgerError::Unauthenticated)?;
    if !verify_shared_key(provided_key, &config.gateway_key) {
        return Err(LedgerError::Unauthenticated);
    }

    let user_id = header_str(headers, HEADER_USER_ID)
        .filter(|v| !v.is_empty())
        .ok_or(LedgerError::Unauthenticated)?;

    let email_verified = header_str(headers, HEADER_EMAIL_VERIFIED) == Some("true");
    if !email_verified {
        return Err(LedgerError::Unauthenticated);
    }

    let email = header_str(headers, HEADER_USER_EMAIL).unwrap_or("");

    Ok(AuthContext {
        user_id: user_id.to_string(),
        email: email.to_string(),
        email_verified,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
