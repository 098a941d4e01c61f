use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dodger_core::leaderboard::{LeaderboardEntry, PlayerStats, Timeframe};
use dodger_core::score::{ScoreAccepted, share_text};
use dodger_core::time::{timestamp_now, unix_millis_now};
use dodger_core::validation::validate_score_submission;

use crate::error::AppError;
use crate::score_store::{GameScore, NewScore, NewUser, User, UsernameTaken};
use crate::state::AppState;

const LEADERBOARD_DEFAULT_LIMIT: usize = 50;
const LEADERBOARD_MAX_LIMIT: usize = 100;
const PLAYER_SCORES_DEFAULT_LIMIT: usize = 10;
const PLAYER_SCORES_MAX_LIMIT: usize = 50;

const USERNAME_MAX_CHARS: usize = 30;
const USERNAME_MIN_CHARS: usize = 3;
const DISPLAY_NAME_MAX_CHARS: usize = 50;
const PFP_URL_MAX_CHARS: usize = 500;
const AUTH_TOKEN_MIN_CHARS: usize = 10;

/// Parse a `limit` query value. Leading digits are read, missing, zero or
/// unparseable values fall back to `default`, and the result is clamped
/// to `1..=max`.
pub fn clamp_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    let parsed = raw.and_then(|s| {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1, s),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        digits[..end].parse::<i64>().ok().map(|n| n * sign)
    });
    match parsed {
        None | Some(0) => default,
        Some(n) if n < 1 => 1,
        Some(n) => (n as usize).min(max),
    }
}

/// Parse a path FID; must be a positive integer.
fn parse_fid(raw: &str) -> Result<u64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n as u64),
        _ => Err(AppError::BadRequest("Invalid FID".to_string())),
    }
}

// ---------------------------------------------------------------------------
// Score submission
// ---------------------------------------------------------------------------

/// POST /api/game/score
pub async fn submit_score(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ScoreAccepted>, AppError> {
    let Json(body) = payload?;
    let validated =
        validate_score_submission(&body, unix_millis_now(), &state.config.validation)
            .map_err(|errors| {
                let codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
                tracing::warn!(?codes, ip = %addr.ip(), "Invalid score submission");
                AppError::Validation(errors)
            })?;

    if !state.cooldown.try_acquire(validated.fid).await {
        tracing::debug!(fid = validated.fid, "score submission inside cooldown");
        return Err(AppError::RateLimited(
            "Rate limit exceeded. Please wait before submitting another score.".to_string(),
        ));
    }

    let mut game_data = Map::new();
    game_data.insert("receivedAt".to_string(), Value::String(timestamp_now()));
    if let Some(agent) = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) {
        game_data.insert("userAgent".to_string(), Value::String(agent.to_string()));
    }
    game_data.insert("ip".to_string(), Value::String(addr.ip().to_string()));
    if let Some(Value::Object(client)) = body.get("gameData") {
        for (key, value) in client {
            game_data
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    let record = state.store.write().await.save_score(
        NewScore {
            fid: validated.fid,
            score: validated.score,
            time_alive: validated.time_alive,
            level: validated.level,
            coins_earned: validated.coins_earned,
            game_data: Value::Object(game_data),
        },
        Utc::now(),
    );
    tracing::info!(
        fid = record.farcaster_fid,
        score = record.score,
        level = record.level,
        id = record.id,
        "score accepted"
    );

    Ok(Json(ScoreAccepted {
        success: true,
        score: record.score,
        share_text: share_text(record.score),
        share_url: state.config.share.public_url.clone(),
    }))
}

// ---------------------------------------------------------------------------
// Leaderboards
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub timeframe: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    pub count: usize,
    pub timestamp: String,
}

/// GET /api/leaderboard/scores
pub async fn leaderboard_scores(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<LeaderboardResponse> {
    let timeframe = Timeframe::parse_or_all(query.timeframe.as_deref());
    let limit = clamp_limit(
        query.limit.as_deref(),
        LEADERBOARD_DEFAULT_LIMIT,
        LEADERBOARD_MAX_LIMIT,
    );
    let leaderboard = state
        .store
        .read()
        .await
        .top_by_score(limit, timeframe, Utc::now());

    Json(LeaderboardResponse {
        count: leaderboard.len(),
        leaderboard,
        timeframe: Some(timeframe),
        timestamp: timestamp_now(),
    })
}

/// GET /api/leaderboard/games
pub async fn leaderboard_games(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<LeaderboardResponse> {
    let limit = clamp_limit(
        query.limit.as_deref(),
        LEADERBOARD_DEFAULT_LIMIT,
        LEADERBOARD_MAX_LIMIT,
    );
    let leaderboard = state.store.read().await.top_by_games(limit);

    Json(LeaderboardResponse {
        count: leaderboard.len(),
        leaderboard,
        timeframe: None,
        timestamp: timestamp_now(),
    })
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PlayerRankResponse {
    pub fid: u64,
    pub rank: Option<u32>,
    pub stats: Option<PlayerStats>,
    pub timestamp: String,
}

/// GET /api/player/{fid}/rank
pub async fn player_rank(
    State(state): State<AppState>,
    Path(raw_fid): Path<String>,
) -> Result<Json<PlayerRankResponse>, AppError> {
    let fid = parse_fid(&raw_fid)?;
    let store = state.store.read().await;
    let rank = store.player_rank(fid, state.config.limits.rank_window, Utc::now());
    Ok(Json(PlayerRankResponse {
        fid,
        rank,
        stats: store.player_stats(fid).cloned(),
        timestamp: timestamp_now(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PlayerScoresQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlayerScoresResponse {
    pub fid: u64,
    pub scores: Vec<GameScore>,
    pub count: usize,
    pub timestamp: String,
}

/// GET /api/player/{fid}/scores
pub async fn player_scores(
    State(state): State<AppState>,
    Path(raw_fid): Path<String>,
    Query(query): Query<PlayerScoresQuery>,
) -> Result<Json<PlayerScoresResponse>, AppError> {
    let fid = parse_fid(&raw_fid)?;
    let limit = clamp_limit(
        query.limit.as_deref(),
        PLAYER_SCORES_DEFAULT_LIMIT,
        PLAYER_SCORES_MAX_LIMIT,
    );
    let scores = state.store.read().await.player_scores(fid, limit);
    Ok(Json(PlayerScoresResponse {
        fid,
        count: scores.len(),
        scores,
        timestamp: timestamp_now(),
    }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarcasterProfile {
    pub fid: u64,
    #[serde(flatten)]
    pub profile: Option<ProfileFields>,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub username: String,
    pub display_name: String,
    pub pfp_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
    pub farcaster: FarcasterProfile,
}

fn sanitize_username(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(USERNAME_MAX_CHARS)
        .collect()
}

fn sanitize_display_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .take(DISPLAY_NAME_MAX_CHARS)
        .collect()
}

/// Keep only http(s) URLs with a host part, truncated.
fn sanitize_pfp_url(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || raw.chars().any(char::is_whitespace) {
        return None;
    }
    Some(raw.chars().take(PFP_URL_MAX_CHARS).collect())
}

fn non_empty_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// POST /api/user
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(body) = payload?;
    let fid = body
        .get("fid")
        .and_then(Value::as_u64)
        .filter(|&f| f > 0)
        .ok_or_else(|| AppError::BadRequest("Valid FID required".to_string()))?;

    let username = match non_empty_str(&body, "username") {
        Some(raw) => sanitize_username(raw),
        None => format!("user_{fid}"),
    };
    if username.chars().count() < USERNAME_MIN_CHARS {
        return Err(AppError::BadRequest(
            "Username must be at least 3 characters".to_string(),
        ));
    }

    let display_name = match non_empty_str(&body, "displayName") {
        Some(raw) => sanitize_display_name(raw),
        None => username.clone(),
    };
    let pfp_url = non_empty_str(&body, "pfpUrl").and_then(sanitize_pfp_url);

    let auth_token = body
        .get("authToken")
        .and_then(Value::as_str)
        .filter(|t| t.chars().count() >= AUTH_TOKEN_MIN_CHARS)
        .ok_or_else(|| AppError::BadRequest("Valid auth token required".to_string()))?;

    let user = state
        .store
        .write()
        .await
        .upsert_user(
            NewUser {
                fid,
                username: username.clone(),
                auth_token: auth_token.chars().take(255).collect(),
                display_name: display_name.clone(),
                pfp_url: pfp_url.clone(),
            },
            Utc::now(),
        )
        .map_err(|UsernameTaken(name)| {
            tracing::info!(fid, username = %name, "username already taken");
            AppError::Conflict("Username already taken".to_string())
        })?;

    Ok(Json(UserResponse {
        user,
        farcaster: FarcasterProfile {
            fid,
            profile: Some(ProfileFields {
                username,
                display_name,
                pfp_url,
            }),
            verified: true,
        },
    }))
}

/// GET /api/user/{fid}
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_fid): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let not_found = || AppError::NotFound("User not found".to_string());
    let fid = parse_fid(&raw_fid).map_err(|_| not_found())?;
    let user = state
        .store
        .read()
        .await
        .user_by_fid(fid)
        .cloned()
        .ok_or_else(not_found)?;

    Ok(Json(UserResponse {
        user,
        farcaster: FarcasterProfile {
            fid,
            profile: None,
            verified: true,
        },
    }))
}

/// Fallback for unknown `/api` paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
