//! Alert engine: decides which compliance modules merit notification.
//!
//! [`evaluate`] is a pure function of company state and `now`: no I/O, no
//! persistence. Alerts are regenerated on every evaluation.

use chrono::{DateTime, Utc};

use duewatch_core::{
    Alert, AlertReason, Company, CompanyAlerts, ComplianceModule, ModuleKind, Priority,
};

/// Priority from the raw (signed) days-remaining value. Anything at five
/// days or less (including already-lapsed deadlines) is critical; beyond
/// 60 days is still medium, there is no lower tier.
pub fn priority_for(days_remaining: i64) -> Priority {
    if days_remaining <= 5 {
        Priority::Critical
    } else if days_remaining <= 30 {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Evaluate one module, appending at most one alert.
///
/// An expiry alert and a renewed-without-invoicing condition on the same
/// module merge: the existing alert is upgraded in place rather than
/// duplicated.
fn evaluate_module(
    kind: ModuleKind,
    module: &ComplianceModule,
    now: DateTime<Utc>,
    alerts: &mut Vec<Alert>,
) {
    if !module.active || module.fully_resolved() {
        return;
    }

    let today = now.date_naive();
    let mut expiry_alert = false;

    if let (Some(end_date), Some(notification_date)) = (module.end_date, module.notification_date)
    {
        if today >= notification_date {
            let raw_days = (end_date - today).num_days();
            alerts.push(Alert {
                module_kind: kind,
                module: kind.label().to_string(),
                end_date: Some(end_date),
                notification_date: Some(notification_date),
                // Clamp for display; the raw value already chose the priority.
                days_remaining: Some(raw_days.max(0)),
                renewed: module.renewed,
                invoiced: module.invoiced,
                priority: priority_for(raw_days),
                reason: AlertReason::UpcomingExpiry,
            });
            expiry_alert = true;
        }
    }

    if module.renewed && !module.invoiced {
        if expiry_alert {
            let alert = alerts.last_mut().expect("expiry alert just pushed");
            alert.reason = AlertReason::ExpiryRenewedUnbilled;
            alert.priority = Priority::Critical;
        } else {
            alerts.push(Alert {
                module_kind: kind,
                module: kind.label().to_string(),
                end_date: module.end_date,
                notification_date: module.notification_date,
                days_remaining: module.end_date.map(|end| (end - today).num_days()),
                renewed: true,
                invoiced: false,
                priority: Priority::High,
                reason: AlertReason::RenewedNotInvoiced,
            });
        }
    }
}

/// Compute prioritized alerts for every company that needs attention.
///
/// Companies with no alerts are dropped. The result is ordered by
/// (best priority rank, smallest days-remaining with `None` as 999); the
/// sort is stable, so ties keep the input order.
pub fn evaluate(companies: &[Company], now: DateTime<Utc>) -> Vec<CompanyAlerts> {
    let mut result: Vec<CompanyAlerts> = Vec::new();

    for company in companies {
        let mut alerts = Vec::new();
        for kind in ModuleKind::ALL {
            evaluate_module(kind, company.module(kind), now, &mut alerts);
        }
        if !alerts.is_empty() {
            result.push(CompanyAlerts {
                tax_id: company.tax_id.clone(),
                name: company.name.clone(),
                kind: company.kind,
                alerts,
            });
        }
    }

    result.sort_by_key(|c| (c.min_priority_rank(), c.min_days_remaining()));
    result
}

/// Keep only alerts whose priority is in `filter`, dropping companies left
/// with none.
pub fn filter_by_priority(
    companies: Vec<CompanyAlerts>,
    filter: &[Priority],
) -> Vec<CompanyAlerts> {
    companies
        .into_iter()
        .filter_map(|mut company| {
            company.alerts.retain(|a| filter.contains(&a.priority));
            if company.alerts.is_empty() {
                None
            } else {
                Some(company)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use duewatch_core::{CompanyKind, CompanyStatus};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap()
    }

    fn blank_company(tax_id: &str) -> Company {
        Company {
            id: 0,
            tax_id: tax_id.to_string(),
            name: format!("Company {tax_id}"),
            kind: CompanyKind::LegalEntity,
            status: CompanyStatus::Active,
            certificate: ComplianceModule::default(),
            resolution: ComplianceModule::default(),
            supporting_document: ComplianceModule::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Active certificate expiring `days` from now, notification window open.
    fn expiring_company(tax_id: &str, days: i64) -> Company {
        let mut company = blank_company(tax_id);
        company.certificate.active = true;
        company
            .certificate
            .set_end_date(Some(fixed_now().date_naive() + Duration::days(days)));
        company
    }

    #[test]
    fn fully_resolved_module_never_alerts() {
        let mut company = expiring_company("1", 3);
        company.certificate.renewed = true;
        company.certificate.invoiced = true;

        assert!(evaluate(&[company], fixed_now()).is_empty());
    }

    #[test]
    fn inactive_module_never_alerts() {
        let mut company = expiring_company("1", 3);
        company.certificate.active = false;

        assert!(evaluate(&[company], fixed_now()).is_empty());
    }

    #[test]
    fn three_days_out_is_critical() {
        let result = evaluate(&[expiring_company("1", 3)], fixed_now());

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].alerts.len(), 1);
        let alert = &result[0].alerts[0];
        assert_eq!(alert.priority, Priority::Critical);
        assert_eq!(alert.days_remaining, Some(3));
        assert_eq!(alert.reason, AlertReason::UpcomingExpiry);
    }

    #[test]
    fn twenty_days_out_is_high() {
        // notification_date = end − 30d is already 10 days in the past
        let result = evaluate(&[expiring_company("1", 20)], fixed_now());

        let alert = &result[0].alerts[0];
        assert_eq!(alert.priority, Priority::High);
        assert_eq!(alert.days_remaining, Some(20));
    }

    #[test]
    fn lapsed_deadline_is_critical_with_clamped_display() {
        let result = evaluate(&[expiring_company("1", -4)], fixed_now());

        let alert = &result[0].alerts[0];
        assert_eq!(alert.priority, Priority::Critical);
        assert_eq!(alert.days_remaining, Some(0));
    }

    #[test]
    fn beyond_sixty_days_stays_medium() {
        assert_eq!(priority_for(61), Priority::Medium);
        assert_eq!(priority_for(400), Priority::Medium);
        assert_eq!(priority_for(45), Priority::Medium);
        assert_eq!(priority_for(30), Priority::High);
        assert_eq!(priority_for(5), Priority::Critical);
    }

    #[test]
    fn renewed_without_invoicing_upgrades_expiry_alert_in_place() {
        let mut company = expiring_company("1", 20);
        company.certificate.renewed = true;

        let result = evaluate(&[company], fixed_now());

        assert_eq!(result[0].alerts.len(), 1, "no duplicate alert per module");
        let alert = &result[0].alerts[0];
        assert_eq!(alert.priority, Priority::Critical);
        assert_eq!(alert.reason, AlertReason::ExpiryRenewedUnbilled);
    }

    #[test]
    fn renewed_without_invoicing_alone_is_high_without_deadline() {
        let mut company = blank_company("1");
        company.resolution.active = true;
        company.resolution.renewed = true;

        let result = evaluate(&[company], fixed_now());

        let alert = &result[0].alerts[0];
        assert_eq!(alert.priority, Priority::High);
        assert_eq!(alert.reason, AlertReason::RenewedNotInvoiced);
        assert_eq!(alert.days_remaining, None);
    }

    #[test]
    fn renewed_before_notification_window_keeps_raw_days() {
        // End date 45 days out: the notification window has not opened, so
        // only the renewed-not-invoiced alert exists, with unclamped days.
        let mut company = blank_company("1");
        company.certificate.active = true;
        company
            .certificate
            .set_end_date(Some(fixed_now().date_naive() + Duration::days(45)));
        company.certificate.renewed = true;

        let result = evaluate(&[company], fixed_now());

        let alert = &result[0].alerts[0];
        assert_eq!(alert.reason, AlertReason::RenewedNotInvoiced);
        assert_eq!(alert.days_remaining, Some(45));
    }

    #[test]
    fn companies_ordered_by_priority_then_days() {
        let companies = vec![
            expiring_company("medium", 50),
            expiring_company("critical", 2),
            expiring_company("high", 20),
        ];

        let result = evaluate(&companies, fixed_now());

        let order: Vec<&str> = result.iter().map(|c| c.tax_id.as_str()).collect();
        assert_eq!(order, vec!["critical", "high", "medium"]);
    }

    #[test]
    fn tied_companies_keep_input_order() {
        let companies = vec![
            expiring_company("first", 10),
            expiring_company("second", 10),
        ];

        let result = evaluate(&companies, fixed_now());

        assert_eq!(result[0].tax_id, "first");
        assert_eq!(result[1].tax_id, "second");
    }

    #[test]
    fn no_deadline_sorts_after_dated_alerts_of_same_priority() {
        let mut undated = blank_company("undated");
        undated.certificate.active = true;
        undated.certificate.renewed = true;

        let result = evaluate(
            &[undated, expiring_company("dated", 20)],
            fixed_now(),
        );

        // Both HIGH; the dated one (20 days) sorts before the 999 sentinel.
        assert_eq!(result[0].tax_id, "dated");
        assert_eq!(result[1].tax_id, "undated");
    }

    #[test]
    fn filter_by_priority_drops_emptied_companies() {
        let companies = evaluate(
            &[expiring_company("critical", 2), expiring_company("medium", 50)],
            fixed_now(),
        );

        let filtered = filter_by_priority(companies, &[Priority::Critical, Priority::High]);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].tax_id, "critical");
    }
}
