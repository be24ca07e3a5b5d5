use std::path::PathBuf;
use std::time::Duration;

use crate::session::DEFAULT_PASS_RATIO;

const DEFAULT_CATALOG_PATH: &str = "./catalog.json";
const DEFAULT_GRADER_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_GRADER_MAX_RETRIES: usize = 2;
/// Upper bound on `GRADER_MAX_RETRIES`
pub const MAX_GRADER_RETRIES: usize = 5;

#[derive(Debug, Clone)]
pub struct GraderConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub data_dir: PathBuf,
    pub catalog_path: PathBuf,
    /// `None` when no grading endpoint is configured
    pub grader: Option<GraderConfig>,
    /// Share of passed questions an attempt needs to count as passed
    pub pass_ratio: f64,
    pub log_level: String,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let data_dir = env_string("SIGNPATH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let catalog_path = PathBuf::from(
            env_string("SIGNPATH_CATALOG").unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string()),
        );

        let grader = env_string("GRADER_ENDPOINT").map(|endpoint| GraderConfig {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(
                env_u64("GRADER_TIMEOUT").unwrap_or(DEFAULT_GRADER_TIMEOUT_MS),
            ),
            max_retries: env_u64("GRADER_MAX_RETRIES")
                .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
                .unwrap_or(DEFAULT_GRADER_MAX_RETRIES)
                .min(MAX_GRADER_RETRIES),
        });

        let pass_ratio = env_string("ATTEMPT_PASS_RATIO")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| (0.0..=1.0).contains(v))
            .unwrap_or(DEFAULT_PASS_RATIO);

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            data_dir,
            catalog_path,
            grader,
            pass_ratio,
            log_level,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("signpath"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}
