use crate::core::error::LedgerError;
use crate::core::state::AppState;
use crate::models::api::{LeaderboardQuery, LeaderboardResponse};
use crate::utils::auth::authenticate;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Top users by points
///
/// GET /leaderboard?limit=<n>
#[instrument(skip(state, headers))]
pub async fn leaderboard_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
    headers: HeaderMap,
) -> Result<Response, LedgerError> {
    state.metrics.increment_requests();

    authenticate(&headers, &state.config.auth).map_err(|e| {
        warn!("Rejected unauthenticated leaderboard request");
        state.metrics.increment_failed();
        e
    })?;

    let entries = state.ledger.leaderboard(params.limit);
    state.metrics.increment_successful();

    Ok((
        StatusCode::OK,
        Json(LeaderboardResponse {
            success: true,
            entries,
        }),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::models::user::User;
    use crate::utils::auth::{HEADER_AUTH_KEY, HEADER_EMAIL_VERIFIED, HEADER_USER_ID};
    use crate::wal::wal::Wal;
    use axum::body::Body;
    use axum::http::HeaderValue;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    fn create_test_state() -> (Arc<AppState>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let wal = Wal::new(temp_dir.path().join("test.wal")).unwrap();
        let config: Config = toml::from_str(
            r#"
                [server]
                port = 8080

                [auth]
                gateway_key = "test-gateway-key"
            "#,
        )
        .unwrap();
        (Arc::new(AppState::new(config, wal, None)), temp_dir)
    }

    fn auth_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_AUTH_KEY, HeaderValue::from_static("test-gateway-key"));
        headers.insert(HEADER_USER_ID, HeaderValue::from_static("viewer"));
        headers.insert(HEADER_EMAIL_VERIFIED, HeaderValue::from_static("true"));
        headers
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_points() {
        let (state, _guard) = create_test_state();

        for (id, points) in [("a", 1), ("b", 9), ("c", 4)] {
            let mut user = User::new(id.to_string(), format!("{}@example.com", id), 0);
            user.points = points;
            state.users.upsert(user);
        }

        let response = leaderboard_handler(
            State(state),
            Query(LeaderboardQuery { limit: None }),
            auth_headers(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, body) = response.into_parts();
        let bytes = Body::new(body).collect().await.unwrap().to_bytes();
        let parsed: LeaderboardResponse = serde_json::from_slice(&bytes).unwrap();

        let ids: Vec<&str> = parsed.entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_leaderboard_requires_auth() {
        let (state, _guard) = create_test_state();

        let result = leaderboard_handler(
            State(state),
            Query(LeaderboardQuery { limit: None }),
            HeaderMap::new(),
        )
        .await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_leaderboard_honors_limit() {
        let (state, _guard) = create_test_state();

        for i in 0..5 {
            state.users.upsert(User::new(
                format!("u{}", i),
                format!("u{}@example.com", i),
                0,
            ));
        }

        let response = leaderboard_handler(
            State(state),
            Query(LeaderboardQuery { limit: Some(2) }),
            auth_headers(),
        )
        .await
        .unwrap();

        let (_, body) = response.into_parts();
        let bytes = Body::new(body).collect().await.unwrap().to_bytes();
        let parsed: LeaderboardResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.entries.len(), 2);
    }
}
