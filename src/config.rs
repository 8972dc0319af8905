//! Runtime configuration
//!
//! Everything is read from `MEALSWAP_*` environment variables at startup.
//! Unparseable values are logged and replaced by their defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::swap::SwapConfig;

pub const DATABASE_PATH_VAR: &str = "MEALSWAP_DATABASE_PATH";
pub const SWAP_SAMPLE_SIZE_VAR: &str = "MEALSWAP_SWAP_SAMPLE_SIZE";
pub const SWAP_TOP_K_VAR: &str = "MEALSWAP_SWAP_TOP_K";
pub const CALORIE_FLOOR_VAR: &str = "MEALSWAP_CALORIE_FLOOR";
pub const SWAP_TIMEOUT_MS_VAR: &str = "MEALSWAP_SWAP_TIMEOUT_MS";
pub const BCRYPT_COST_VAR: &str = "MEALSWAP_BCRYPT_COST";

/// Daily calorie target used for per-meal-type shares
pub const DEFAULT_DAILY_CALORIE_TARGET: f64 = 2000.0;
pub const DAILY_CALORIE_TARGET_VAR: &str = "MEALSWAP_DAILY_CALORIES";

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub swap: SwapConfig,
    pub bcrypt_cost: u32,
    pub daily_calorie_target: f64,
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SwapConfig::default();
        let swap = SwapConfig {
            sample_size: parse_or(&lookup, SWAP_SAMPLE_SIZE_VAR, defaults.sample_size, |v: &usize| *v > 0),
            top_k: parse_or(&lookup, SWAP_TOP_K_VAR, defaults.top_k, |v: &usize| *v > 0),
            calorie_floor: parse_or(&lookup, CALORIE_FLOOR_VAR, defaults.calorie_floor, |v: &f64| {
                v.is_finite() && *v >= 0.0
            }),
            search_timeout: Duration::from_millis(parse_or(
                &lookup,
                SWAP_TIMEOUT_MS_VAR,
                defaults.search_timeout.as_millis() as u64,
                |v: &u64| *v > 0,
            )),
        };

        Self {
            database_path: lookup(DATABASE_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            swap,
            bcrypt_cost: parse_or(&lookup, BCRYPT_COST_VAR, bcrypt::DEFAULT_COST, |v: &u32| {
                (4..=31).contains(v)
            }),
            daily_calorie_target: parse_or(
                &lookup,
                DAILY_CALORIE_TARGET_VAR,
                DEFAULT_DAILY_CALORIE_TARGET,
                |v: &f64| v.is_finite() && *v > 0.0,
            ),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(key, value = %raw, default = %default, "invalid configuration value; using default");
            default
        }
    }
}

/// `data/mealswap.db` next to the project root, or next to the binary
fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }

    path.push("data");
    path.push("mealswap.db");
    path
}
