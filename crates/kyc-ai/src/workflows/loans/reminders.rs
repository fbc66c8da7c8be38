//! EMI reminder sweep, run once per external trigger.
//!
//! Pre-due reminders are sent once per horizon: a horizon counts as sent as
//! soon as one channel delivers. Overdue notices carry no sent flag and
//! repeat on every run while the installment stays upcoming.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use super::emi::{EmiInstallment, ReminderHorizon};
use super::repository::EmiRepository;
use crate::workflows::notifications::{NotificationContext, NotificationDispatcher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderSweepReport {
    pub success: bool,
    pub reminders_sent: usize,
    pub overdue_notices: usize,
    pub errors: Vec<String>,
}

pub struct EmiReminderScheduler<E> {
    emis: Arc<E>,
    notifier: Arc<NotificationDispatcher>,
}

impl<E> EmiReminderScheduler<E>
where
    E: EmiRepository + 'static,
{
    pub fn new(emis: Arc<E>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self { emis, notifier }
    }

    /// Failures are collected per row; the sweep itself always succeeds.
    pub async fn run(&self, today: NaiveDate) -> ReminderSweepReport {
        let mut report = ReminderSweepReport {
            success: true,
            reminders_sent: 0,
            overdue_notices: 0,
            errors: Vec::new(),
        };

        for horizon in ReminderHorizon::ALL {
            let Some(target) = today.checked_add_days(Days::new(horizon.days_ahead())) else {
                continue;
            };
            let due = match self.emis.upcoming_due_on(target) {
                Ok(rows) => rows,
                Err(err) => {
                    report.errors.push(format!("{target}: {err}"));
                    continue;
                }
            };

            for mut installment in due.into_iter().filter(|row| !row.reminder_sent(horizon)) {
                let body = format!(
                    "your EMI #{} of {:.2} for loan {} is due {} ({}).",
                    installment.installment_number,
                    installment.amount,
                    installment.loan_application_id.0,
                    horizon.phrase(),
                    installment.due_date
                );
                if !self
                    .deliver(&installment, "EMI payment reminder", &body, &mut report.errors)
                    .await
                {
                    continue;
                }
                installment.mark_reminder_sent(horizon);
                let id = installment.id.clone();
                match self.emis.update(installment) {
                    Ok(()) => report.reminders_sent += 1,
                    Err(err) => report.errors.push(format!("{id}: {err}")),
                }
            }
        }

        match self.emis.upcoming_overdue(today) {
            Ok(rows) => {
                for installment in rows {
                    let days_late = (today - installment.due_date).num_days();
                    let body = format!(
                        "your EMI #{} of {:.2} for loan {} was due on {} and is {} day(s) overdue. \
                         Please pay immediately to avoid penalties.",
                        installment.installment_number,
                        installment.amount,
                        installment.loan_application_id.0,
                        installment.due_date,
                        days_late
                    );
                    if self
                        .deliver(&installment, "EMI overdue", &body, &mut report.errors)
                        .await
                    {
                        report.overdue_notices += 1;
                    }
                }
            }
            Err(err) => report.errors.push(format!("overdue sweep: {err}")),
        }

        info!(
            %today,
            reminders_sent = report.reminders_sent,
            overdue_notices = report.overdue_notices,
            errors = report.errors.len(),
            "emi reminder sweep finished"
        );
        report
    }

    /// Returns whether the customer was reached. Each failed channel is
    /// pushed onto `errors`.
    async fn deliver(
        &self,
        installment: &EmiInstallment,
        subject: &str,
        body: &str,
        errors: &mut Vec<String>,
    ) -> bool {
        let context = NotificationContext {
            kyc_application_id: None,
            loan_application_id: Some(installment.loan_application_id.0.clone()),
            emi_id: Some(installment.id.clone()),
        };
        let delivery = self
            .notifier
            .notify_contact(&installment.customer, subject, body, context)
            .await;
        for (channel, err) in &delivery.failures {
            warn!(emi_id = %installment.id, channel = channel.label(), error = %err, "emi notification failed");
            errors.push(format!("{} ({}): {err}", installment.id, channel.label()));
        }
        !delivery.undelivered()
    }
}
