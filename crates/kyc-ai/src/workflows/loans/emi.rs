use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{LoanApplication, LoanApplicationId};
use crate::workflows::notifications::ContactDetails;
use crate::workflows::IdSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmiStatus {
    Upcoming,
    Paid,
}

/// Pre-due reminder windows, each with its own sent flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderHorizon {
    SevenDays,
    ThreeDays,
    OneDay,
    DueToday,
}

impl ReminderHorizon {
    pub const ALL: [ReminderHorizon; 4] = [
        ReminderHorizon::SevenDays,
        ReminderHorizon::ThreeDays,
        ReminderHorizon::OneDay,
        ReminderHorizon::DueToday,
    ];

    pub const fn days_ahead(self) -> u64 {
        match self {
            ReminderHorizon::SevenDays => 7,
            ReminderHorizon::ThreeDays => 3,
            ReminderHorizon::OneDay => 1,
            ReminderHorizon::DueToday => 0,
        }
    }

    pub const fn phrase(self) -> &'static str {
        match self {
            ReminderHorizon::SevenDays => "in 7 days",
            ReminderHorizon::ThreeDays => "in 3 days",
            ReminderHorizon::OneDay => "tomorrow",
            ReminderHorizon::DueToday => "today",
        }
    }
}

/// One scheduled monthly installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmiInstallment {
    pub id: String,
    pub loan_application_id: LoanApplicationId,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub principal_component: f64,
    pub interest_component: f64,
    pub status: EmiStatus,
    pub reminder_sent_7_days: bool,
    pub reminder_sent_3_days: bool,
    pub reminder_sent_1_day: bool,
    pub reminder_sent_due_day: bool,
    pub customer: ContactDetails,
}

impl EmiInstallment {
    pub fn reminder_sent(&self, horizon: ReminderHorizon) -> bool {
        match horizon {
            ReminderHorizon::SevenDays => self.reminder_sent_7_days,
            ReminderHorizon::ThreeDays => self.reminder_sent_3_days,
            ReminderHorizon::OneDay => self.reminder_sent_1_day,
            ReminderHorizon::DueToday => self.reminder_sent_due_day,
        }
    }

    pub fn mark_reminder_sent(&mut self, horizon: ReminderHorizon) {
        let flag = match horizon {
            ReminderHorizon::SevenDays => &mut self.reminder_sent_7_days,
            ReminderHorizon::ThreeDays => &mut self.reminder_sent_3_days,
            ReminderHorizon::OneDay => &mut self.reminder_sent_1_day,
            ReminderHorizon::DueToday => &mut self.reminder_sent_due_day,
        };
        *flag = true;
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Standard amortised installment; flat split when the rate is zero.
pub fn monthly_installment(principal: f64, annual_rate_percent: f64, tenure_months: u32) -> f64 {
    if tenure_months == 0 {
        return 0.0;
    }
    let n = f64::from(tenure_months);
    let r = annual_rate_percent / 12.0 / 100.0;
    if r == 0.0 {
        return round2(principal / n);
    }
    let growth = (1.0 + r).powf(n);
    round2(principal * r * growth / (growth - 1.0))
}

/// Installments due monthly from `disbursed_on`. The final installment
/// absorbs rounding so principal components sum to the loan amount.
pub fn build_schedule(
    loan: &LoanApplication,
    disbursed_on: NaiveDate,
    ids: &IdSequence,
) -> Vec<EmiInstallment> {
    let emi = monthly_installment(loan.loan_amount, loan.interest_rate, loan.tenure_months);
    let rate = loan.interest_rate / 12.0 / 100.0;
    let mut balance = loan.loan_amount;
    let mut schedule = Vec::with_capacity(loan.tenure_months as usize);

    for number in 1..=loan.tenure_months {
        let Some(due_date) = disbursed_on.checked_add_months(Months::new(number)) else {
            break;
        };
        let interest = round2(balance * rate);
        let (principal, amount) = if number == loan.tenure_months {
            let principal = round2(balance);
            (principal, round2(principal + interest))
        } else {
            (round2(emi - interest), emi)
        };
        balance = round2(balance - principal);

        schedule.push(EmiInstallment {
            id: ids.next_id(),
            loan_application_id: loan.id.clone(),
            installment_number: number,
            due_date,
            amount,
            principal_component: principal,
            interest_component: interest,
            status: EmiStatus::Upcoming,
            reminder_sent_7_days: false,
            reminder_sent_3_days: false,
            reminder_sent_1_day: false,
            reminder_sent_due_day: false,
            customer: loan.applicant.clone(),
        });
    }

    schedule
}
