//! # Close Reconciliation
//!
//! Compares the physically counted drawer with the computed expected balance.
//!
//! ```text
//!   difference = closing_amount − expected_balance
//!
//!   difference > 0  → Surplus   (more cash than expected)
//!   difference < 0  → Shortage  (cash is missing)
//!   difference = 0  → Exact
//! ```
//!
//! A [`CloseReport`] is the immutable snapshot handed to reporting and
//! printing collaborators. Formatting is theirs.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::summary::Summary;
use crate::types::Register;

/// Sign of the close difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Surplus,
    Shortage,
    Exact,
}

impl Classification {
    pub fn classify(difference: Money) -> Self {
        if difference.is_positive() {
            Classification::Surplus
        } else if difference.is_negative() {
            Classification::Shortage
        } else {
            Classification::Exact
        }
    }
}

/// Snapshot of a closed register: the frozen record, the summary it was
/// reconciled against and the resulting difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReport {
    pub register: Register,
    pub summary: Summary,
    pub difference: Money,
    pub classification: Classification,
}

impl CloseReport {
    /// Builds the report for a register that has already been closed.
    ///
    /// ## Errors
    /// `Validation` if the register is still open.
    pub fn new(register: Register, summary: Summary) -> CoreResult<Self> {
        let closing_amount = register
            .closing_amount()
            .ok_or_else(|| ValidationError::Required {
                field: "closing_amount".to_string(),
            })?;

        let difference = closing_amount - summary.expected_balance;

        Ok(CloseReport {
            register,
            summary,
            difference,
            classification: Classification::classify(difference),
        })
    }

    pub fn closing_amount(&self) -> Money {
        self.summary.expected_balance + self.difference
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
