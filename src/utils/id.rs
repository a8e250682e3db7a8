use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of generated session ids, matching the document-store ids the
/// web client was built around
const SESSION_ID_LEN: usize = 20;

pub fn new_session_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Payment references are readable and unique per attempt:
/// `rs_<user>_<millis>_<random hex>`
pub fn new_payment_reference(user_id: &str, now_millis: i64) -> String {
    let suffix: [u8; 4] = rand::rng().random();
    format!("rs_{}_{}_{}", user_id, now_millis, hex::encode(suffix))
}
