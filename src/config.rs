//! Run configuration
//!
//! Everything is validated here, before the ledger is touched.

use std::path::PathBuf;

use crate::detector::DuplicateKey;
use crate::error::{RaffleError, RaffleResult};
use crate::fairness::Salt;
use crate::report::{CsvView, ReportOptions};
use crate::types::ChainId;

pub const DEFAULT_FACTOMD_HOST: &str = "localhost:8088";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactomdConfig {
    /// `host:port`, or a full base URL
    pub host: String,
    pub timeout_secs: u64,
}

impl Default for FactomdConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_FACTOMD_HOST.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FactomdConfig {
    /// JSON-RPC endpoint of the v2 API
    pub fn api_url(&self) -> String {
        let base = self.host.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{base}/v2")
        } else {
            format!("http://{base}/v2")
        }
    }
}

/// Where results go besides stdout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub report: ReportOptions,
}

/// Validated configuration of one raffle run
#[derive(Debug, Clone)]
pub struct RaffleConfig {
    pub chain_id: ChainId,
    pub salt: Salt,
    pub factomd: FactomdConfig,
    pub duplicate_key: DuplicateKey,
    pub output: OutputConfig,
}

/// Unvalidated operator input
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub chain_id: Option<String>,
    pub salt: Option<String>,
    pub host: Option<String>,
    pub timeout_secs: Option<u64>,
    pub duplicate_key: Option<String>,
    pub csv: Option<PathBuf>,
    pub compact: bool,
    pub show_invalid_identity: bool,
    pub json: Option<PathBuf>,
}

impl RaffleConfig {
    pub fn new(raw: RawConfig) -> RaffleResult<Self> {
        let salt = match raw.salt.as_deref().map(str::trim) {
            None | Some("") => return Err(RaffleError::Configuration("must provide a salt".into())),
            Some(s) => Salt::from_hex(s)?,
        };

        let chain_id: ChainId = match raw.chain_id.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(RaffleError::Configuration("must provide a chain id".into()));
            }
            Some(s) => s.parse()?,
        };

        let host = raw.host.unwrap_or_else(|| DEFAULT_FACTOMD_HOST.to_string());
        if host.trim().is_empty() {
            return Err(RaffleError::Configuration("factomd host is empty".into()));
        }

        let timeout_secs = raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(RaffleError::Configuration("timeout must be at least 1 second".into()));
        }

        let duplicate_key = match raw.duplicate_key {
            Some(k) => k.parse()?,
            None => DuplicateKey::default(),
        };

        let view = if raw.compact { CsvView::Compact } else { CsvView::Full };

        Ok(Self {
            chain_id,
            salt,
            factomd: FactomdConfig {
                host: host.trim().to_string(),
                timeout_secs,
            },
            duplicate_key,
            output: OutputConfig {
                csv: raw.csv,
                json: raw.json,
                report: ReportOptions {
                    view,
                    show_invalid_identity: raw.show_invalid_identity,
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawConfig {
        RawConfig {
            chain_id: Some("ab".repeat(32)),
            salt: Some("aa".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = RaffleConfig::new(raw()).unwrap();
        assert_eq!(config.factomd, FactomdConfig::default());
        assert_eq!(config.duplicate_key, DuplicateKey::Content);
        assert_eq!(config.output.report.view, CsvView::Full);
        assert_eq!(config.salt.as_bytes(), &[0xAA]);
    }

    #[test]
    fn test_missing_salt_checked_first() {
        let err = RaffleConfig::new(RawConfig::default()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("salt"));
    }

    #[test]
    fn test_missing_chain_id() {
        let err = RaffleConfig::new(RawConfig { chain_id: None, ..raw() }).unwrap_err();
        assert!(err.to_string().contains("chain id"));
    }

    #[test]
    fn test_bad_inputs() {
        assert!(RaffleConfig::new(RawConfig { salt: Some("zz".into()), ..raw() }).is_err());
        assert!(RaffleConfig::new(RawConfig { chain_id: Some("abc".into()), ..raw() }).is_err());
        assert!(RaffleConfig::new(RawConfig { host: Some(" ".into()), ..raw() }).is_err());
        assert!(RaffleConfig::new(RawConfig { timeout_secs: Some(0), ..raw() }).is_err());
        assert!(RaffleConfig::new(RawConfig { duplicate_key: Some("x".into()), ..raw() }).is_err());
    }

    #[test]
    fn test_api_url() {
        assert_eq!(FactomdConfig::default().api_url(), "http://localhost:8088/v2");
        let tls = FactomdConfig {
            host: "https://api.factomd.net/".into(),
            timeout_secs: 5,
        };
        assert_eq!(tls.api_url(), "https://api.factomd.net/v2");
    }
}
