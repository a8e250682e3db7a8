use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct SessionIdRequest {
    pub session_id: String,
}

#[derive(Serialize)]
pub struct StartSessionResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Serialize)]
pub struct PauseSessionResponse {
    pub success: bool,
    pub message: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct ResumeSessionResponse {
    pub success: bool,
    pub paused_accumulated_millis: i64,
}

#[derive(Serialize)]
pub struct EndSessionResponse {
    pub success: bool,
    pub total_active_millis: i64,
    pub points_awarded: bool,
    pub points: i64,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub display_name: String,
    pub points: i64,
}

#[derive(Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub success: bool,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Deserialize)]
pub struct CreatePaymentRequest {
    pub email: String,
    pub amount: i64,
}

#[derive(Serialize)]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub reference: String,
}

#[derive(Deserialize)]
pub struct VerifyPaymentRequest {
    pub reference: String,
}

#[derive(Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub amount: i64,
    pub currency: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
