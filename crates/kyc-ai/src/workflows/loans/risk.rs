//! Point-accumulation loan risk scoring.
//!
//! Each rule adds points independently; the total is bucketed into a rating.

use serde::{Deserialize, Serialize};

use super::domain::LoanApplication;

const HIGH_RATING_FLOOR: u32 = 40;
const MEDIUM_RATING_FLOOR: u32 = 20;
const SELF_EMPLOYED: &str = "Self Employed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRating {
    Low,
    Medium,
    High,
}

impl RiskRating {
    pub const fn label(self) -> &'static str {
        match self {
            RiskRating::Low => "low",
            RiskRating::Medium => "medium",
            RiskRating::High => "high",
        }
    }

    pub const fn from_score(score: u32) -> Self {
        if score >= HIGH_RATING_FLOOR {
            RiskRating::High
        } else if score >= MEDIUM_RATING_FLOOR {
            RiskRating::Medium
        } else {
            RiskRating::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    HighDebtToIncomeRatio,
    ModerateDebtToIncomeRatio,
    LowCreditScore,
    FairCreditScore,
    SelfEmployed,
    HighLoanToIncomeRatio,
}

impl RiskFactor {
    pub const fn code(self) -> &'static str {
        match self {
            RiskFactor::HighDebtToIncomeRatio => "high_debt_to_income_ratio",
            RiskFactor::ModerateDebtToIncomeRatio => "moderate_debt_to_income_ratio",
            RiskFactor::LowCreditScore => "low_credit_score",
            RiskFactor::FairCreditScore => "fair_credit_score",
            RiskFactor::SelfEmployed => "self_employed",
            RiskFactor::HighLoanToIncomeRatio => "high_loan_to_income_ratio",
        }
    }

    pub const fn points(self) -> u32 {
        match self {
            RiskFactor::HighDebtToIncomeRatio => 30,
            RiskFactor::ModerateDebtToIncomeRatio => 15,
            RiskFactor::LowCreditScore => 25,
            RiskFactor::FairCreditScore => 10,
            RiskFactor::SelfEmployed => 10,
            RiskFactor::HighLoanToIncomeRatio => 20,
        }
    }
}

/// Financial inputs the scorer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskInputs<'a> {
    pub monthly_income: f64,
    pub existing_emi: f64,
    pub credit_card_outstanding: f64,
    pub credit_score: Option<u16>,
    pub employment_type: &'a str,
    pub loan_amount: f64,
}

impl<'a> From<&'a LoanApplication> for RiskInputs<'a> {
    fn from(application: &'a LoanApplication) -> Self {
        Self {
            monthly_income: application.monthly_income,
            existing_emi: application.existing_emi,
            credit_card_outstanding: application.credit_card_outstanding,
            credit_score: application.credit_score,
            employment_type: &application.employment_type,
            loan_amount: application.loan_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskComponent {
    pub factor: RiskFactor,
    pub points: u32,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub debt_to_income_ratio: f64,
    pub score: u32,
    pub rating: RiskRating,
    pub components: Vec<RiskComponent>,
}

impl RiskAssessment {
    pub fn factor_codes(&self) -> Vec<String> {
        self.components
            .iter()
            .map(|component| component.factor.code().to_string())
            .collect()
    }
}

/// Monthly obligations as a percentage of monthly income, 2 decimals.
pub fn debt_to_income_ratio(existing_emi: f64, credit_card_outstanding: f64, monthly_income: f64) -> f64 {
    let ratio = unrounded_debt_to_income(existing_emi, credit_card_outstanding, monthly_income);
    (ratio * 100.0).round() / 100.0
}

fn unrounded_debt_to_income(existing_emi: f64, credit_card_outstanding: f64, monthly_income: f64) -> f64 {
    if monthly_income <= 0.0 {
        return 0.0;
    }
    (existing_emi + credit_card_outstanding) / monthly_income * 100.0
}

/// Bands are applied to the exact ratio; only the reported ratio is rounded.
pub fn score_risk(inputs: &RiskInputs<'_>) -> RiskAssessment {
    let ratio = unrounded_debt_to_income(
        inputs.existing_emi,
        inputs.credit_card_outstanding,
        inputs.monthly_income,
    );
    let dti = debt_to_income_ratio(
        inputs.existing_emi,
        inputs.credit_card_outstanding,
        inputs.monthly_income,
    );
    let mut components = Vec::new();

    if ratio > 50.0 {
        components.push(component(
            RiskFactor::HighDebtToIncomeRatio,
            format!("debt-to-income {dti:.2}% above 50%"),
        ));
    } else if ratio >= 40.0 {
        components.push(component(
            RiskFactor::ModerateDebtToIncomeRatio,
            format!("debt-to-income {dti:.2}% between 40% and 50%"),
        ));
    }

    match inputs.credit_score {
        Some(score) if score < 650 => components.push(component(
            RiskFactor::LowCreditScore,
            format!("credit score {score} below 650"),
        )),
        Some(score) if score < 700 => components.push(component(
            RiskFactor::FairCreditScore,
            format!("credit score {score} between 650 and 699"),
        )),
        _ => {}
    }

    if inputs.employment_type == SELF_EMPLOYED {
        components.push(component(
            RiskFactor::SelfEmployed,
            "self-employed income".to_string(),
        ));
    }

    let annual_income = inputs.monthly_income * 12.0;
    if inputs.loan_amount > annual_income * 3.0 {
        components.push(component(
            RiskFactor::HighLoanToIncomeRatio,
            format!(
                "loan {:.0} exceeds three times annual income {:.0}",
                inputs.loan_amount, annual_income
            ),
        ));
    }

    let score = components.iter().map(|component| component.points).sum();
    RiskAssessment {
        debt_to_income_ratio: dti,
        score,
        rating: RiskRating::from_score(score),
        components,
    }
}

fn component(factor: RiskFactor, notes: String) -> RiskComponent {
    RiskComponent {
        factor,
        points: factor.points(),
        notes,
    }
}
