//! Plausibility checks for untrusted score submissions.
//!
//! [`validate_score_submission`] runs every rule against the raw JSON body
//! and reports all violations at once, so a client can show each reason.
//! It has no side effects; rate limiting and persistence belong to the
//! caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::score::format_thousands;
use crate::time::parse_client_timestamp;

/// Ceilings and tolerance bands applied to submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreLimits {
    pub max_score: u64,
    pub min_time_alive_secs: f64,
    pub max_time_alive_secs: f64,
    pub max_level: u32,
    /// Baseline earning rate used by the score/time check.
    pub base_points_per_sec: f64,
    /// Survival time over which the bonus multiplier ramps from 1x.
    pub survival_bonus_ramp_secs: f64,
    pub max_survival_bonus: f64,
    /// Headroom multiplier over the computed score/time ceiling.
    pub score_variance: f64,
    pub secs_per_level: f64,
    /// Levels a run may be ahead of `time_alive / secs_per_level`.
    pub level_slack: u32,
    pub min_points_per_level: u64,
    pub max_points_per_level: u64,
    /// How far the run timestamp may sit from the server clock, either way.
    pub max_timestamp_skew_ms: i64,
}

impl Default for ScoreLimits {
    fn default() -> Self {
        Self {
            max_score: 500_000,
            min_time_alive_secs: 1.0,
            max_time_alive_secs: 1800.0,
            max_level: 100,
            base_points_per_sec: 50.0,
            survival_bonus_ramp_secs: 300.0,
            max_survival_bonus: 2.0,
            score_variance: 1.5,
            secs_per_level: 15.0,
            level_slack: 3,
            min_points_per_level: 500,
            max_points_per_level: 10_000,
            max_timestamp_skew_ms: 300_000,
        }
    }
}

impl ScoreLimits {
    /// Highest score accepted for a run of `time_alive` seconds.
    pub fn score_ceiling_for(&self, time_alive: f64) -> f64 {
        let base = time_alive * self.base_points_per_sec;
        let bonus = (1.0 + time_alive / self.survival_bonus_ramp_secs).min(self.max_survival_bonus);
        (base * bonus).floor() * self.score_variance
    }
}

/// One failed validation rule.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidFid,
    InvalidScore,
    ScoreNotInteger,
    ScoreTooHigh { max: u64 },
    InvalidTimeAlive { min_secs: f64 },
    TimeAliveTooHigh { max_secs: f64 },
    InvalidLevel,
    LevelTooHigh { max: u32 },
    ScoreUnrealisticForTime { score: u64, time_alive: f64 },
    LevelProgressionTooFast { level: u32, time_alive: f64 },
    ScoreTooLowForLevel { score: u64, level: u32 },
    ScoreTooHighForLevel { score: u64, level: u32 },
    MissingGameData,
    MissingTimestamp,
    InvalidTimestamp,
    SessionTooOld,
    SessionFromFuture,
}

impl ValidationError {
    /// Stable identifier for the violated rule.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFid => "INVALID_FID",
            Self::InvalidScore => "INVALID_SCORE",
            Self::ScoreNotInteger => "SCORE_NOT_INTEGER",
            Self::ScoreTooHigh { .. } => "SCORE_TOO_HIGH",
            Self::InvalidTimeAlive { .. } => "INVALID_TIME_ALIVE",
            Self::TimeAliveTooHigh { .. } => "TIME_ALIVE_TOO_HIGH",
            Self::InvalidLevel => "INVALID_LEVEL",
            Self::LevelTooHigh { .. } => "LEVEL_TOO_HIGH",
            Self::ScoreUnrealisticForTime { .. } => "SCORE_UNREALISTIC_FOR_TIME",
            Self::LevelProgressionTooFast { .. } => "LEVEL_PROGRESSION_TOO_FAST",
            Self::ScoreTooLowForLevel { .. } => "SCORE_TOO_LOW_FOR_LEVEL",
            Self::ScoreTooHighForLevel { .. } => "SCORE_TOO_HIGH_FOR_LEVEL",
            Self::MissingGameData => "MISSING_GAME_DATA",
            Self::MissingTimestamp => "MISSING_TIMESTAMP",
            Self::InvalidTimestamp => "INVALID_TIMESTAMP",
            Self::SessionTooOld => "SESSION_TOO_OLD",
            Self::SessionFromFuture => "SESSION_FROM_FUTURE",
        }
    }

    /// Replay and freshness failures cannot be fixed by resubmitting the
    /// same payload.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::SessionTooOld | Self::SessionFromFuture)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFid => write!(f, "Invalid or missing FID"),
            Self::InvalidScore => write!(f, "Invalid score: must be a non-negative number"),
            Self::ScoreNotInteger => write!(f, "Score must be a whole number"),
            Self::ScoreTooHigh { max } => {
                write!(f, "Score too high: maximum {} points", format_thousands(*max))
            },
            Self::InvalidTimeAlive { min_secs } => {
                write!(f, "Invalid timeAlive: must be at least {min_secs} second(s)")
            },
            Self::TimeAliveTooHigh { max_secs } => {
                write!(f, "Time alive too high: maximum {} minutes", max_secs / 60.0)
            },
            Self::InvalidLevel => write!(f, "Invalid level: must be a whole number of at least 1"),
            Self::LevelTooHigh { max } => write!(f, "Level too high: maximum {max}"),
            Self::ScoreUnrealisticForTime { score, time_alive } => write!(
                f,
                "Score unrealistic for time played: {score} points in {time_alive} seconds"
            ),
            Self::LevelProgressionTooFast { level, time_alive } => write!(
                f,
                "Level progression too fast: level {level} in {time_alive} seconds"
            ),
            Self::ScoreTooLowForLevel { score, level } => write!(
                f,
                "Score too low for level achieved: {score} points at level {level}"
            ),
            Self::ScoreTooHighForLevel { score, level } => write!(
                f,
                "Score too high for level achieved: {score} points at level {level}"
            ),
            Self::MissingGameData => write!(f, "Game data required for validation"),
            Self::MissingTimestamp => write!(f, "Game timestamp required"),
            Self::InvalidTimestamp => write!(f, "Game timestamp is not a valid date"),
            Self::SessionTooOld => write!(f, "Game session too old"),
            Self::SessionFromFuture => write!(f, "Game timestamp is in the future"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Numeric fields of a submission that passed every rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedScore {
    pub fid: u64,
    pub score: u64,
    /// Seconds, rounded to one decimal place.
    pub time_alive: f64,
    pub level: u32,
    pub coins_earned: u64,
}

fn whole_number(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0
}

/// Check a raw `{fid, score, gameData}` body against `limits`.
///
/// `now_ms` is the server clock in epoch milliseconds. All applicable
/// errors are collected; nothing short-circuits.
pub fn validate_score_submission(
    payload: &Value,
    now_ms: i64,
    limits: &ScoreLimits,
) -> Result<ValidatedScore, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let game_data = payload.get("gameData").filter(|v| v.is_object());
    let game_field = |name: &str| game_data.and_then(|g| g.get(name)).and_then(Value::as_f64);

    let fid = match payload.get("fid").and_then(Value::as_f64) {
        Some(f) if f > 0.0 && whole_number(f) => Some(f as u64),
        _ => {
            errors.push(ValidationError::InvalidFid);
            None
        },
    };

    let score = match payload.get("score").and_then(Value::as_f64) {
        Some(s) if s.is_finite() && s >= 0.0 => {
            if s > limits.max_score as f64 {
                errors.push(ValidationError::ScoreTooHigh {
                    max: limits.max_score,
                });
                None
            } else if !whole_number(s) {
                errors.push(ValidationError::ScoreNotInteger);
                None
            } else {
                Some(s as u64)
            }
        },
        _ => {
            errors.push(ValidationError::InvalidScore);
            None
        },
    };

    let time_alive = match game_field("timeAlive") {
        Some(t) if t.is_finite() && t >= limits.min_time_alive_secs => {
            if t > limits.max_time_alive_secs {
                errors.push(ValidationError::TimeAliveTooHigh {
                    max_secs: limits.max_time_alive_secs,
                });
                None
            } else {
                Some((t * 10.0).round() / 10.0)
            }
        },
        _ => {
            errors.push(ValidationError::InvalidTimeAlive {
                min_secs: limits.min_time_alive_secs,
            });
            None
        },
    };

    let level = match game_field("level") {
        Some(l) if l >= 1.0 && whole_number(l) => {
            if l > f64::from(limits.max_level) {
                errors.push(ValidationError::LevelTooHigh {
                    max: limits.max_level,
                });
                None
            } else {
                Some(l as u32)
            }
        },
        _ => {
            errors.push(ValidationError::InvalidLevel);
            None
        },
    };

    if let (Some(score), Some(time_alive)) = (score, time_alive)
        && score > 0
        && score as f64 > limits.score_ceiling_for(time_alive)
    {
        errors.push(ValidationError::ScoreUnrealisticForTime { score, time_alive });
    }

    if let (Some(level), Some(time_alive)) = (level, time_alive)
        && level > 1
    {
        let max_expected = (time_alive / limits.secs_per_level).floor() as u32 + 1;
        if level > max_expected + limits.level_slack {
            errors.push(ValidationError::LevelProgressionTooFast { level, time_alive });
        }
    }

    if let (Some(score), Some(level)) = (score, level)
        && score > 0
    {
        let min_expected = u64::from(level - 1) * limits.min_points_per_level;
        let max_expected = u64::from(level) * limits.max_points_per_level;
        if score < min_expected {
            errors.push(ValidationError::ScoreTooLowForLevel { score, level });
        } else if score > max_expected {
            errors.push(ValidationError::ScoreTooHighForLevel { score, level });
        }
    }

    match game_data {
        None => errors.push(ValidationError::MissingGameData),
        Some(g) => match g.get("timestamp").filter(|v| !v.is_null()) {
            None => errors.push(ValidationError::MissingTimestamp),
            Some(raw) => match parse_client_timestamp(raw) {
                None => errors.push(ValidationError::InvalidTimestamp),
                Some(ts) => {
                    let age = now_ms.saturating_sub(ts);
                    if age > limits.max_timestamp_skew_ms {
                        errors.push(ValidationError::SessionTooOld);
                    } else if age < -limits.max_timestamp_skew_ms {
                        errors.push(ValidationError::SessionFromFuture);
                    }
                },
            },
        },
    }

    let coins_earned = game_field("coinsEarned")
        .filter(|c| c.is_finite() && *c >= 0.0)
        .map(|c| c.floor() as u64)
        .unwrap_or(0);

    match (fid, score, time_alive, level) {
        (Some(fid), Some(score), Some(time_alive), Some(level)) if errors.is_empty() => {
            Ok(ValidatedScore {
                fid,
                score,
                time_alive,
                level,
                coins_earned,
            })
        },
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const NOW: i64 = 1_767_225_600_000;

    fn payload(score: f64, time_alive: f64, level: f64) -> Value {
        json!({
            "fid": 1,
            "score": score,
            "gameData": { "timeAlive": time_alive, "level": level, "timestamp": NOW },
        })
    }

    fn check(v: &Value) -> Result<ValidatedScore, Vec<ValidationError>> {
        validate_score_submission(v, NOW, &ScoreLimits::default())
    }

    #[test]
    fn plausible_short_run_is_accepted() {
        let ok = check(&payload(200.0, 5.0, 1.0)).unwrap();
        assert_eq!(ok.fid, 1);
        assert_eq!(ok.score, 200);
        assert_eq!(ok.level, 1);
        assert!((ok.time_alive - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn too_many_points_for_time_is_rejected() {
        let errs = check(&payload(1000.0, 5.0, 1.0)).unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::ScoreUnrealisticForTime {
                score: 1000,
                time_alive: 5.0
            }]
        );
    }

    #[test]
    fn errors_accumulate_instead_of_short_circuiting() {
        let v = json!({ "fid": -3, "score": "lots" });
        let errs = check(&v).unwrap_err();
        let codes: Vec<_> = errs.iter().map(ValidationError::code).collect();
        assert_eq!(
            codes,
            vec![
                "INVALID_FID",
                "INVALID_SCORE",
                "INVALID_TIME_ALIVE",
                "INVALID_LEVEL",
                "MISSING_GAME_DATA"
            ]
        );
    }

    #[test]
    fn score_ceiling_and_fraction() {
        let errs = check(&payload(600_000.0, 100.0, 5.0)).unwrap_err();
        assert!(errs.contains(&ValidationError::ScoreTooHigh { max: 500_000 }));

        let errs = check(&payload(10.5, 5.0, 1.0)).unwrap_err();
        assert_eq!(errs, vec![ValidationError::ScoreNotInteger]);
    }

    #[test]
    fn time_alive_bounds() {
        let errs = check(&payload(0.0, 0.5, 1.0)).unwrap_err();
        assert_eq!(errs, vec![ValidationError::InvalidTimeAlive { min_secs: 1.0 }]);

        let errs = check(&payload(0.0, 1801.0, 1.0)).unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::TimeAliveTooHigh { max_secs: 1800.0 }]
        );
    }

    #[test]
    fn time_alive_rounds_to_one_decimal() {
        let ok = check(&payload(0.0, 12.345, 1.0)).unwrap();
        assert!((ok.time_alive - 12.3).abs() < 1e-9);
    }

    #[test]
    fn level_bounds() {
        let errs = check(&payload(0.0, 100.0, 0.0)).unwrap_err();
        assert_eq!(errs, vec![ValidationError::InvalidLevel]);

        let errs = check(&payload(0.0, 1800.0, 101.0)).unwrap_err();
        assert_eq!(errs, vec![ValidationError::LevelTooHigh { max: 100 }]);

        let errs = check(&payload(0.0, 10.0, 2.5)).unwrap_err();
        assert_eq!(errs, vec![ValidationError::InvalidLevel]);
    }

    #[test]
    fn level_must_track_time_alive() {
        // 30s allows up to level floor(30/15)+1+3 = 6
        assert!(check(&payload(0.0, 30.0, 6.0)).is_ok());
        let errs = check(&payload(0.0, 30.0, 7.0)).unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::LevelProgressionTooFast {
                level: 7,
                time_alive: 30.0
            }]
        );
    }

    #[test]
    fn score_per_level_band() {
        let errs = check(&payload(900.0, 60.0, 3.0)).unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::ScoreTooLowForLevel {
                score: 900,
                level: 3
            }]
        );

        let errs = check(&payload(10_001.0, 300.0, 1.0)).unwrap_err();
        assert!(errs.contains(&ValidationError::ScoreTooHighForLevel {
            score: 10_001,
            level: 1
        }));
    }

    #[test]
    fn level_floor_is_tunable_for_survival_pacing() {
        // 10 pts/s with a level every 10 s: 25 s alive means level 3 and
        // 250 points, below the default floor of 500 per level.
        let run = payload(250.0, 25.0, 3.0);
        let errs = check(&run).unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::ScoreTooLowForLevel {
                score: 250,
                level: 3
            }]
        );

        let paced = ScoreLimits {
            min_points_per_level: 100,
            ..ScoreLimits::default()
        };
        assert!(validate_score_submission(&run, NOW, &paced).is_ok());
    }

    #[test]
    fn timestamp_rules() {
        let mut v = payload(100.0, 5.0, 1.0);
        v["gameData"]["timestamp"] = Value::Null;
        assert_eq!(check(&v).unwrap_err(), vec![ValidationError::MissingTimestamp]);

        v["gameData"]["timestamp"] = json!("not a date");
        assert_eq!(check(&v).unwrap_err(), vec![ValidationError::InvalidTimestamp]);

        v["gameData"]["timestamp"] = json!(NOW - 300_001);
        let errs = check(&v).unwrap_err();
        assert_eq!(errs, vec![ValidationError::SessionTooOld]);
        assert!(errs[0].is_permanent());

        v["gameData"]["timestamp"] = json!(NOW + 600_000);
        assert_eq!(check(&v).unwrap_err(), vec![ValidationError::SessionFromFuture]);

        v["gameData"]["timestamp"] = json!("2026-01-01T00:00:00Z");
        assert!(check(&v).is_ok());
    }

    #[test]
    fn coins_default_to_zero() {
        let ok = check(&payload(100.0, 5.0, 1.0)).unwrap();
        assert_eq!(ok.coins_earned, 0);

        let mut v = payload(100.0, 5.0, 1.0);
        v["gameData"]["coinsEarned"] = json!(3.7);
        assert_eq!(check(&v).unwrap().coins_earned, 3);
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            ValidationError::ScoreTooHigh { max: 500_000 }.to_string(),
            "Score too high: maximum 500,000 points"
        );
        assert_eq!(
            ValidationError::TimeAliveTooHigh { max_secs: 1800.0 }.to_string(),
            "Time alive too high: maximum 30 minutes"
        );
    }

    proptest! {
        #[test]
        fn scores_over_the_time_ceiling_never_pass(
            time_alive in 1.0f64..1800.0,
            excess in 1u64..10_000,
        ) {
            let limits = ScoreLimits::default();
            let time_alive = (time_alive * 10.0).round() / 10.0;
            let score = limits.score_ceiling_for(time_alive).floor() as u64 + excess;
            let v = payload(score as f64, time_alive, 1.0);
            prop_assert!(validate_score_submission(&v, NOW, &limits).is_err());
        }
    }
}
