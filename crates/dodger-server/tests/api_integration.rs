#[allow(dead_code)]
mod common;

use serde_json::json;

use dodger_core::test_helpers::submission_json;
use dodger_core::time::unix_millis_now;

use common::TestServer;

#[tokio::test]
async fn plausible_score_is_accepted() {
    let server = TestServer::new().await;
    let (status, body) = server.submit(1, 200, 5.0, 1).await;
    assert_eq!(status, 200, "body: {body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["score"], 200);
    assert!(body["shareText"].as_str().unwrap().contains("200 points"));
    assert_eq!(body["shareUrl"], "http://localhost:5000");
}

#[tokio::test]
async fn share_text_uses_thousands_separators() {
    let server = TestServer::new().await;
    let (status, body) = server.submit(1, 12_500, 200.0, 13).await;
    assert_eq!(status, 200, "body: {body}");
    assert!(
        body["shareText"]
            .as_str()
            .unwrap()
            .contains("12,500 points in Space Dodger")
    );
}

#[tokio::test]
async fn unrealistic_score_is_rejected_with_details() {
    let server = TestServer::new().await;
    let (status, body) = server.submit(1, 1000, 5.0, 1).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid score data");
    let details = body["details"].as_array().unwrap();
    assert!(!details.is_empty());
    assert!(
        details[0]
            .as_str()
            .unwrap()
            .starts_with("Score unrealistic for time played")
    );
    assert_eq!(body["codes"][0], "SCORE_UNREALISTIC_FOR_TIME");
}

#[tokio::test]
async fn every_broken_field_is_reported() {
    let server = TestServer::new().await;
    let (status, body) = server
        .post_json("/api/game/score", &json!({ "fid": -1, "score": "lots" }))
        .await;
    assert_eq!(status, 400);
    let codes: Vec<&str> = body["codes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    for expected in [
        "INVALID_FID",
        "INVALID_SCORE",
        "INVALID_TIME_ALIVE",
        "INVALID_LEVEL",
        "MISSING_GAME_DATA",
    ] {
        assert!(codes.contains(&expected), "missing {expected} in {codes:?}");
    }
}

#[tokio::test]
async fn stale_submission_is_rejected() {
    let server = TestServer::new().await;
    let ten_minutes_ago = unix_millis_now() - 10 * 60 * 1000;
    let (status, body) = server
        .post_json(
            "/api/game/score",
            &submission_json(1, 200, 5.0, 1, ten_minutes_ago),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["codes"][0], "SESSION_TOO_OLD");
}

#[tokio::test]
async fn second_submission_inside_cooldown_is_429() {
    let server = TestServer::new().await;
    let (first, _) = server.submit(5, 200, 5.0, 1).await;
    assert_eq!(first, 200);
    let (second, body) = server.submit(5, 210, 5.0, 1).await;
    assert_eq!(second, 429);
    assert!(body["error"].as_str().unwrap().starts_with("Rate limit exceeded"));

    // Another player is unaffected.
    let (other, _) = server.submit(6, 200, 5.0, 1).await;
    assert_eq!(other, 200);
}

#[tokio::test]
async fn rejected_submission_does_not_start_cooldown() {
    let server = TestServer::new().await;
    let (bad, _) = server.submit(5, 1000, 5.0, 1).await;
    assert_eq!(bad, 400);
    let (good, _) = server.submit(5, 200, 5.0, 1).await;
    assert_eq!(good, 200);
}

#[tokio::test]
async fn score_leaderboard_ranks_best_scores() {
    let server = TestServer::with_score_cooldown(0).await;
    assert_eq!(server.submit(1, 800, 60.0, 2).await.0, 200);
    assert_eq!(server.submit(2, 1500, 90.0, 3).await.0, 200);
    assert_eq!(server.submit(3, 200, 5.0, 1).await.0, 200);
    assert_eq!(server.submit(3, 300, 8.0, 1).await.0, 200);

    let (status, body) = server.get_json("/api/leaderboard/scores").await;
    assert_eq!(status, 200);
    assert_eq!(body["timeframe"], "all");
    assert_eq!(body["count"], 3);
    let board = body["leaderboard"].as_array().unwrap();
    assert_eq!(board[0]["fid"], 2);
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[0]["username"], "Player 2");
    assert_eq!(board[1]["fid"], 1);
    assert_eq!(board[2]["fid"], 3);
    assert_eq!(board[2]["score"], 300);
    assert_eq!(board[2]["gamesPlayed"], 2);

    let (_, limited) = server
        .get_json("/api/leaderboard/scores?timeframe=daily&limit=1")
        .await;
    assert_eq!(limited["timeframe"], "daily");
    assert_eq!(limited["count"], 1);

    let (_, fallback) = server
        .get_json("/api/leaderboard/scores?timeframe=monthly")
        .await;
    assert_eq!(fallback["timeframe"], "all");
}

#[tokio::test]
async fn games_leaderboard_counts_plays() {
    let server = TestServer::with_score_cooldown(0).await;
    assert_eq!(server.submit(1, 200, 5.0, 1).await.0, 200);
    assert_eq!(server.submit(2, 200, 5.0, 1).await.0, 200);
    assert_eq!(server.submit(2, 250, 6.0, 1).await.0, 200);

    let (status, body) = server.get_json("/api/leaderboard/games?limit=10").await;
    assert_eq!(status, 200);
    assert!(body.get("timeframe").is_none());
    let board = body["leaderboard"].as_array().unwrap();
    assert_eq!(board[0]["fid"], 2);
    assert_eq!(board[0]["gamesPlayed"], 2);
    assert_eq!(board[0]["score"], 250);
}

#[tokio::test]
async fn player_rank_and_stats() {
    let server = TestServer::with_score_cooldown(0).await;
    assert_eq!(server.submit(1, 200, 5.0, 1).await.0, 200);
    assert_eq!(server.submit(2, 300, 8.0, 1).await.0, 200);

    let (status, body) = server.get_json("/api/player/1/rank").await;
    assert_eq!(status, 200);
    assert_eq!(body["fid"], 1);
    assert_eq!(body["rank"], 2);
    assert_eq!(body["stats"]["totalGamesPlayed"], 1);
    assert_eq!(body["stats"]["highestScore"], 200);

    let (_, unranked) = server.get_json("/api/player/99/rank").await;
    assert!(unranked["rank"].is_null());
    assert!(unranked["stats"].is_null());

    let (bad, body) = server.get_json("/api/player/abc/rank").await;
    assert_eq!(bad, 400);
    assert_eq!(body["error"], "Invalid FID");
    assert_eq!(server.get_json("/api/player/0/rank").await.0, 400);
}

#[tokio::test]
async fn player_scores_newest_first() {
    let server = TestServer::with_score_cooldown(0).await;
    for score in [200, 220, 240] {
        assert_eq!(server.submit(4, score, 5.0, 1).await.0, 200);
    }

    let (status, body) = server.get_json("/api/player/4/scores?limit=2").await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 2);
    assert_eq!(body["scores"][0]["score"], 240);
    assert_eq!(body["scores"][1]["score"], 220);
    assert_eq!(body["scores"][0]["gameData"]["timeAlive"], 5.0);
    assert!(body["scores"][0]["gameData"]["receivedAt"].is_string());
}

#[tokio::test]
async fn create_and_fetch_user() {
    let server = TestServer::new().await;
    let (status, body) = server
        .post_json(
            "/api/user",
            &json!({
                "fid": 77,
                "username": "space cadet!",
                "authToken": "a-long-enough-token",
                "displayName": "<b>Cadet</b>",
                "pfpUrl": "https://img.example.com/77.png",
            }),
        )
        .await;
    assert_eq!(status, 200, "body: {body}");
    assert_eq!(body["username"], "spacecadet");
    assert_eq!(body["farcasterFid"], 77);
    assert_eq!(body["farcaster"]["displayName"], "bCadet/b");
    assert_eq!(body["farcaster"]["pfpUrl"], "https://img.example.com/77.png");
    assert_eq!(body["farcaster"]["verified"], true);
    assert!(body.get("authToken").is_none());

    let (status, fetched) = server.get_json("/api/user/77").await;
    assert_eq!(status, 200);
    assert_eq!(fetched["username"], "spacecadet");
    assert_eq!(fetched["farcaster"]["fid"], 77);

    // The leaderboard picks up the profile.
    assert_eq!(server.submit(77, 200, 5.0, 1).await.0, 200);
    let (_, board) = server.get_json("/api/leaderboard/scores").await;
    assert_eq!(board["leaderboard"][0]["username"], "spacecadet");
    assert_eq!(board["leaderboard"][0]["displayName"], "bCadet/b");
}

#[tokio::test]
async fn user_defaults_and_rejections() {
    let server = TestServer::new().await;
    let (status, body) = server
        .post_json("/api/user", &json!({ "fid": 8, "authToken": "0123456789" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["username"], "user_8");
    assert_eq!(body["farcaster"]["displayName"], "user_8");
    assert!(body["farcaster"]["pfpUrl"].is_null());

    let (status, body) = server
        .post_json("/api/user", &json!({ "fid": 0, "authToken": "0123456789" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Valid FID required");

    let (status, body) = server
        .post_json(
            "/api/user",
            &json!({ "fid": 9, "username": "!!", "authToken": "0123456789" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Username must be at least 3 characters");

    let (status, body) = server
        .post_json("/api/user", &json!({ "fid": 9, "authToken": "short" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Valid auth token required");

    let (status, body) = server.get_json("/api/user/404").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn username_held_by_another_fid_is_refused() {
    let server = TestServer::new().await;
    let owner = json!({
        "fid": 10,
        "username": "alice",
        "authToken": "owner-token-123",
        "displayName": "Alice",
    });
    assert_eq!(server.post_json("/api/user", &owner).await.0, 200);

    let rival = json!({
        "fid": 11,
        "username": "alice",
        "authToken": "rival-token-456",
        "displayName": "Mallory",
    });
    let (status, body) = server.post_json("/api/user", &rival).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "Username already taken");

    let (status, fetched) = server.get_json("/api/user/10").await;
    assert_eq!(status, 200);
    assert_eq!(fetched["farcasterFid"], 10);
    assert_eq!(fetched["displayName"], "Alice");
    assert_eq!(server.get_json("/api/user/11").await.0, 404);
}

#[tokio::test]
async fn malformed_json_gets_json_error() {
    let server = TestServer::new().await;
    for path in ["/api/game/score", "/api/user"] {
        let resp = server
            .client
            .post(server.url(path))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "{path}");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].is_string(), "{path}: {body}");
    }
}

#[tokio::test]
async fn health_reports_counts() {
    let server = TestServer::new().await;
    assert_eq!(server.submit(1, 200, 5.0, 1).await.0, 200);

    let (status, body) = server.get_json("/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "Space Dodger");
    assert_eq!(body["scores_stored"], 1);
    assert_eq!(body["players"], 1);
}

#[tokio::test]
async fn unknown_api_path_is_json_404() {
    let server = TestServer::new().await;
    let (status, body) = server.get_json("/api/nope").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn api_responses_are_not_cached() {
    let server = TestServer::new().await;
    let resp = server
        .client
        .get(server.url("/api/leaderboard/games"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers().get("cache-control").unwrap(),
        "no-store"
    );
}

#[tokio::test]
async fn per_ip_limiter_answers_429() {
    let server = TestServer::with_api_burst(3).await;
    for _ in 0..3 {
        assert_eq!(server.get_json("/api/leaderboard/games").await.0, 200);
    }
    let resp = server
        .client
        .get(server.url("/api/leaderboard/games"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 429);
    // The test bucket barely refills, so the advertised wait is the cap.
    assert_eq!(resp.headers().get("retry-after").unwrap(), "60");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn racing_submissions_for_one_player_accept_once() {
    let server = TestServer::new().await;
    let attempts = (0..8).map(|i| server.submit(42, 200 + i, 5.0, 1));
    let statuses: Vec<u16> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|(status, _)| status)
        .collect();
    assert_eq!(statuses.iter().filter(|&&s| s == 200).count(), 1);
    assert_eq!(statuses.iter().filter(|&&s| s == 429).count(), 7);

    let (_, body) = server.get_json("/api/player/42/scores").await;
    assert_eq!(body["count"], 1);
}
