pub mod assembler;
pub mod config;
pub mod detector;
pub mod eligibility;
pub mod entry;
pub mod error;
pub mod fairness;
pub mod ledger;
pub mod record;
pub mod report;
pub mod types;

pub use assembler::{AuditFinding, RaffleRun, RunMetadata, ensure_ledger_order, run_pipeline};
pub use config::{FactomdConfig, OutputConfig, RaffleConfig, RawConfig};
pub use detector::{DetectorState, DuplicateKey};
pub use entry::{Candidate, RaffleEntry, Validity};
pub use error::{RaffleError, RaffleResult};
pub use fairness::{Salt, fairness_score, verify_score};
pub use ledger::{FactomdClient, LedgerSource, MemoryLedger};
pub use record::{entry_hash, parse_record, parse_records};
pub use report::{CsvView, ReportOptions};
pub use types::*;
