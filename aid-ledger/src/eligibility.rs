//! Eligibility classification for aid requests
//!
//! Rules are evaluated in order, first match wins:
//!
//! 1. Assets beyond basic needs, or monthly income above the Sadaqah
//!    threshold → [`Eligibility::Sadaqah`]
//! 2. Essential need with more dependents than the threshold, or income
//!    below the Zakah ceiling → [`Eligibility::Zakah`]
//! 3. Otherwise → [`Eligibility::Both`]
//!
//! Undeclared income or dependents never satisfy a comparison. They are not
//! treated as zero, so an incomplete submission cannot land in the Zakah
//! category by omission.

use crate::{
    types::{AidRequestSubmission, Eligibility, NeedType},
    Error, Result,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Financial attributes the classifier looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationInput {
    /// Requested total
    pub amount: Decimal,
    /// Declared need
    pub need_type: NeedType,
    /// Declared monthly income
    pub monthly_income: Option<Decimal>,
    /// Declared dependents
    pub dependents: Option<u32>,
    /// Holds assets beyond basic needs
    pub has_assets: Option<bool>,
}

impl From<&AidRequestSubmission> for ClassificationInput {
    fn from(submission: &AidRequestSubmission) -> Self {
        Self {
            amount: submission.amount,
            need_type: submission.need_type,
            monthly_income: submission.monthly_income,
            dependents: submission.dependents,
            has_assets: submission.has_assets,
        }
    }
}

/// Thresholds used by the classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRules {
    /// Income strictly above this makes a request Sadaqah-only
    pub sadaqah_income_threshold: Decimal,

    /// Income strictly below this qualifies an essential need for Zakah
    pub zakah_income_ceiling: Decimal,

    /// More dependents than this qualifies an essential need for Zakah
    pub zakah_dependents_threshold: u32,
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self {
            sadaqah_income_threshold: dec!(1500),
            zakah_income_ceiling: dec!(800),
            zakah_dependents_threshold: 2,
        }
    }
}

impl EligibilityRules {
    /// Classify a request
    pub fn classify(&self, input: &ClassificationInput) -> Result<Eligibility> {
        validate(input)?;

        let income_above_threshold = input
            .monthly_income
            .map_or(false, |income| income > self.sadaqah_income_threshold);

        if input.has_assets == Some(true) || income_above_threshold {
            return Ok(Eligibility::Sadaqah);
        }

        let many_dependents = input
            .dependents
            .map_or(false, |count| count > self.zakah_dependents_threshold);
        let low_income = input
            .monthly_income
            .map_or(false, |income| income < self.zakah_income_ceiling);

        if input.need_type == NeedType::Essential && (many_dependents || low_income) {
            return Ok(Eligibility::Zakah);
        }

        Ok(Eligibility::Both)
    }
}

/// Classify with the default thresholds
pub fn classify(input: &ClassificationInput) -> Result<Eligibility> {
    EligibilityRules::default().classify(input)
}

fn validate(input: &ClassificationInput) -> Result<()> {
    if input.amount <= Decimal::ZERO {
        return Err(Error::validation("amount must be positive"));
    }

    if let Some(income) = input.monthly_income {
        if income < Decimal::ZERO {
            return Err(Error::validation("monthly income cannot be negative"));
        }
    }

    Ok(())
}
