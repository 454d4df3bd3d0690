//! Gateway result code classification
//!
//! | resultcode | Outcome | Caller action |
//! |------------|---------|---------------|
//! | `000` | [`Outcome::Success`] | done |
//! | `111`, `927` | [`Outcome::InProgress`] | query status after [`STATUS_QUERY_COOLDOWN`] |
//! | `999` | [`Outcome::Ambiguous`] | do not retry, wait for reconciliation |
//! | anything else | [`Outcome::Failed`] | surface; retry only with a new transaction id |

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Completed successfully
pub const RESULT_SUCCESS: &str = "000";
/// Accepted, still processing
pub const RESULT_IN_PROGRESS: &str = "111";
/// Accepted, pending at the destination
pub const RESULT_PENDING: &str = "927";
/// Status indeterminate
pub const RESULT_AMBIGUOUS: &str = "999";

/// How long to wait before querying an in-progress transaction
pub const STATUS_QUERY_COOLDOWN: Duration = Duration::from_secs(180);

/// Classified result of a gateway call
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Operation fully completed
    Success,
    /// Accepted but not finalized
    InProgress,
    /// Indeterminate; never retry the money movement
    Ambiguous,
    /// Terminal failure
    Failed,
}

impl Outcome {
    /// Classify a result code
    ///
    /// Codes are matched exactly; padded or otherwise altered codes are
    /// failures.
    pub fn from_result_code(code: &str) -> Self {
        match code {
            RESULT_SUCCESS => Outcome::Success,
            RESULT_IN_PROGRESS | RESULT_PENDING => Outcome::InProgress,
            RESULT_AMBIGUOUS => Outcome::Ambiguous,
            _ => Outcome::Failed,
        }
    }

    /// Lowercase label used in responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::InProgress => "in_progress",
            Outcome::Ambiguous => "ambiguous",
            Outcome::Failed => "failed",
        }
    }

    /// Whether the transaction has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::Failed)
    }

    /// Message telling the caller what to do next
    pub fn caller_message(&self, transid: &str, gateway_message: &str) -> String {
        match self {
            Outcome::Success => format!("Transaction {} completed", transid),
            Outcome::InProgress => format!(
                "Transaction {} in progress. Query status after {} minutes.",
                transid,
                STATUS_QUERY_COOLDOWN.as_secs() / 60
            ),
            Outcome::Ambiguous => format!(
                "Transaction {} status ambiguous. Wait for reconciliation.",
                transid
            ),
            Outcome::Failed => format!("Transaction {} failed: {}", transid, gateway_message),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
