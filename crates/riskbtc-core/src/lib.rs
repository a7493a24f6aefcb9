pub mod assess;
pub mod error;
pub mod nonce;
pub mod registry;
pub mod score;
pub mod signature;
pub mod source;
pub mod types;

#[cfg(test)]
mod test_util;

pub use assess::{AssessConfig, Assessor, CancelFlag};
pub use error::CoreError;
pub use registry::{AddressListRegistry, CompromisedKeyRegistry, NoRegistry};
pub use source::{BlockchainSource, EsploraClient};
pub use types::{AssessmentResult, BatchReport, RiskLevel, ScanOutcome};
