use std::time::Duration;

/// Where published tables are fetched from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    /// Directory URL holding `{id}.csv` snapshots.
    pub base_url: String,
    pub timeout: Duration,
}

pub const DEFAULT_BASE_URL: &str = "https://www.ine.es/jaxiT3/files/t/es/csv_bdsc";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SourceConfig {
    /// Defaults, overridden by `IPC_BASE_URL` and `IPC_TIMEOUT_SECS` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("IPC_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("IPC_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => log::warn!("Ignoring invalid IPC_TIMEOUT_SECS={raw:?}"),
            }
        }
        config
    }
}
