use crate::infra::{offline_config, Platform};
use chrono::{Days, Local, NaiveDate};
use clap::Args;
use kyc_ai::error::AppError;
use kyc_ai::workflows::governance::ComplianceLedger;
use kyc_ai::workflows::kyc::{KycStatus, KycSubmission, SubmittedDocument};
use kyc_ai::workflows::loans::{
    LoanAction, LoanApplicationId, LoanDecisionRequest, LoanStatus, LoanSubmission,
};
use kyc_ai::workflows::notifications::{NotificationLog, NotificationPreferences};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Disbursal date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) disbursed_on: Option<NaiveDate>,
    /// Date the EMI reminder sweep runs for. Defaults to a week before the first EMI.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) sweep_date: Option<NaiveDate>,
    /// Requested loan amount in rupees.
    #[arg(long, default_value_t = 500_000.0)]
    pub(crate) loan_amount: f64,
    /// Apply as a self-employed borrower, which adds risk points.
    #[arg(long)]
    pub(crate) self_employed: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        disbursed_on,
        sweep_date,
        loan_amount,
        self_employed,
    } = args;
    let disbursed_on = disbursed_on.unwrap_or_else(|| Local::now().date_naive());

    let platform = Platform::build(&offline_config());
    println!("KYC and loan compliance demo (mock providers, in-memory storage)");

    println!("\nKYC submission");
    let application = platform.kyc.submit(demo_kyc_submission())?;
    println!("  Application {} stored as pending", application.id.0);

    let report = platform.kyc.verify(&application.id).await?;
    println!(
        "  Verification: {} ({}) at {:.2}% confidence",
        report.status.label(),
        report.ai_verification_status.label(),
        report.confidence
    );
    for document in &report.documents {
        println!(
            "  - {} [{}]: {} at {:.0}% ({})",
            document.category.label(),
            document.document_type,
            if document.is_valid { "valid" } else { "invalid" },
            document.confidence,
            document.extraction_source.label()
        );
    }
    if report.risk_flags.is_empty() {
        println!("  Risk flags: none");
    } else {
        println!("  Risk flags: {}", report.risk_flags.join(", "));
    }
    println!("  Consistency: {}", report.consistency.summary());
    println!("  Compliance narrative: {}", report.narrative);

    if report.status != KycStatus::Verified {
        println!("\nKYC is not verified; loan intake skipped.");
        return Ok(());
    }

    println!("\nLoan assessment");
    let employment_type = if self_employed {
        "Self Employed"
    } else {
        "Salaried"
    };
    let loan = platform.loans.submit(LoanSubmission {
        kyc_application_id: application.id.0.clone(),
        loan_type: "personal".to_string(),
        loan_amount,
        tenure_months: 24,
        interest_rate: 10.5,
        monthly_income: 85_000.0,
        existing_emi: 12_000.0,
        credit_card_outstanding: 3_000.0,
        credit_score: Some(742),
        employment_type: employment_type.to_string(),
        purpose: Some("home renovation".to_string()),
    })?;
    println!(
        "  Loan {} submitted, debt-to-income {:.2}%",
        loan.id.0, loan.debt_to_income_ratio
    );

    let assessment = platform.loans.assess(&loan.id)?;
    println!(
        "  Risk score {} ({}), status {}",
        assessment.risk_score,
        assessment.risk_rating.label(),
        assessment.status.label()
    );
    for component in &assessment.components {
        println!(
            "  - {} (+{}): {}",
            component.factor.code(),
            component.points,
            component.notes
        );
    }
    if assessment.status == LoanStatus::PendingGovernanceReview {
        println!("  Escalated for governance review before approval");
    }

    for action in [LoanAction::Approve, LoanAction::Sanction, LoanAction::Disburse] {
        let updated = platform
            .loans
            .decide(
                &loan.id,
                LoanDecisionRequest {
                    assessor: "demo-credit-officer".to_string(),
                    action,
                    notes: None,
                    disbursed_on: Some(disbursed_on),
                },
            )
            .await?;
        println!("  Assessor decision -> {}", updated.status.label());
    }

    render_schedule(&platform, &loan.id)?;

    let first_due = platform
        .loans
        .schedule(&loan.id)?
        .first()
        .map(|row| row.due_date);
    let sweep_date = sweep_date
        .or_else(|| first_due.and_then(|due| due.checked_sub_days(Days::new(7))))
        .unwrap_or(disbursed_on);
    let sweep = platform.reminders.run(sweep_date).await;
    println!("\nEMI reminder sweep for {sweep_date}");
    println!(
        "  Reminders sent: {}, overdue notices: {}, errors: {}",
        sweep.reminders_sent,
        sweep.overdue_notices,
        sweep.errors.len()
    );

    println!("\nGovernance");
    let alerts = platform.ledger.alerts(true).unwrap_or_default();
    if alerts.is_empty() {
        println!("  Open alerts: none");
    } else {
        for alert in alerts {
            println!("  - [{}] {}: {}", alert.severity.label(), alert.title, alert.description);
        }
    }
    let kyc_trail = platform.ledger.audit_trail(&application.id.0).unwrap_or_default();
    let loan_trail = platform.ledger.audit_trail(&loan.id.0).unwrap_or_default();
    println!(
        "  Audit entries: {} for {}, {} for {}",
        kyc_trail.len(),
        application.id.0,
        loan_trail.len(),
        loan.id.0
    );
    let sent = platform.notifications.recent(usize::MAX).unwrap_or_default();
    println!("  Notifications recorded: {}", sent.len());

    Ok(())
}

fn render_schedule(platform: &Platform, loan_id: &LoanApplicationId) -> Result<(), AppError> {
    let schedule = platform.loans.schedule(loan_id)?;
    println!("\nEMI schedule ({} installments)", schedule.len());
    for row in schedule.iter().take(3) {
        println!(
            "  #{:<3} {}  {:>10.2}  (principal {:.2}, interest {:.2})",
            row.installment_number,
            row.due_date,
            row.amount,
            row.principal_component,
            row.interest_component
        );
    }
    if schedule.len() > 3 {
        println!("  ... {} more", schedule.len() - 3);
    }
    Ok(())
}

fn demo_document(kind: &str, number: Option<&str>) -> SubmittedDocument {
    SubmittedDocument {
        url: format!("memory://kyc-documents/demo/{kind}.jpg"),
        document_type: kind.to_string(),
        document_number: number.map(str::to_string),
        file_name: Some(format!("{kind}.jpg")),
        content_type: Some("image/jpeg".to_string()),
    }
}

fn demo_kyc_submission() -> KycSubmission {
    KycSubmission {
        full_name: "Rajesh Kumar".to_string(),
        email: Some("rajesh.kumar@example.com".to_string()),
        phone: Some("+919800000001".to_string()),
        date_of_birth: Some("1990-08-15".to_string()),
        address: Some("42 MG Road, Bengaluru, Karnataka 560001".to_string()),
        identity_document: Some(demo_document("aadhaar", Some("1234 5678 9012"))),
        address_document: Some(demo_document("utility_bill", None)),
        pan_document: Some(demo_document("pan", Some("ABCDE1234F"))),
        notification_preferences: NotificationPreferences::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_completes_against_offline_providers() {
        let args = DemoArgs {
            disbursed_on: NaiveDate::from_ymd_opt(2026, 1, 15),
            sweep_date: None,
            loan_amount: 500_000.0,
            self_employed: true,
        };

        run_demo(args).await.expect("demo completes");
    }
}
