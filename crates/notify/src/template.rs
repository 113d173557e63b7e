//! Minijinja rendering of the HTML alert digest.
//!
//! The digest groups every alert by priority with a summary header, one
//! card per alert. A fresh [`minijinja::Environment`] is created per render
//! call; the template is a single embedded string.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use duewatch_core::{CompanyAlerts, Priority};

use crate::traits::NotifyError;

/// One alert flattened with its company, as the template consumes it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertRow {
    pub company_name: String,
    pub tax_id: String,
    pub module: String,
    pub reason: String,
    pub end_date: Option<String>,
    pub days_remaining: Option<i64>,
    pub renewed: bool,
    pub invoiced: bool,
}

/// Context data available to the digest template.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DigestContext {
    pub generated_on: String,
    pub total: usize,
    pub critical: Vec<AlertRow>,
    pub high: Vec<AlertRow>,
    pub medium: Vec<AlertRow>,
}

const DIGEST_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }
    .header { background-color: #1f2937; color: white; padding: 20px; text-align: center; border-radius: 8px 8px 0 0; }
    .summary { background-color: #f3f4f6; padding: 15px; margin: 20px 0; border-radius: 8px; }
    .group h3 { padding: 10px; border-radius: 8px; color: white; }
    .critical { background-color: #ef4444; }
    .high { background-color: #f59e0b; }
    .medium { background-color: #3b82f6; }
    .card { background-color: white; border: 1px solid #e5e7eb; border-radius: 8px; padding: 15px; margin: 10px 0; }
    .company { font-size: 18px; font-weight: bold; color: #1f2937; }
    .tax-id { color: #6b7280; font-size: 14px; }
    .module { color: #3b82f6; font-weight: bold; margin: 10px 0; }
    .reason { background-color: #fef3c7; padding: 8px; border-radius: 4px; margin: 5px 0; }
    .badge { padding: 4px 8px; border-radius: 4px; font-size: 12px; font-weight: bold; }
    .badge-renewed { background-color: #dbeafe; color: #1e40af; }
    .badge-invoiced { background-color: #d1fae5; color: #065f46; }
    .footer { text-align: center; margin-top: 30px; padding: 20px; color: #6b7280; font-size: 14px; }
  </style>
</head>
<body>
  <div class="header">
    <h1>Compliance Deadline Tracker</h1>
    <p>Expiry notifications</p>
  </div>
  <div class="summary">
    <h2>Summary for {{ generated_on }}</h2>
    <p><strong>Total notifications:</strong> {{ total }}</p>
    <p>Critical: {{ critical | length }} | High priority: {{ high | length }} | Medium priority: {{ medium | length }}</p>
  </div>
{%- for group in [["CRITICAL", "critical", critical], ["HIGH PRIORITY", "high", high], ["MEDIUM PRIORITY", "medium", medium]] %}
{%- if group[2] %}
  <div class="group">
    <h3 class="{{ group[1] }}">{{ group[0] }} ({{ group[2] | length }})</h3>
{%- for alert in group[2] %}
    <div class="card">
      <div class="company">{{ alert.company_name }}</div>
      <div class="tax-id">Tax ID: {{ alert.tax_id }}</div>
      <div class="module">{{ alert.module }}</div>
      <div class="reason">{{ alert.reason }}</div>
      <div>
{%- if alert.end_date %}
        <span>Expires: {{ alert.end_date }}</span>
{%- endif %}
{%- if alert.days_remaining is not none %}
        <span>{{ alert.days_remaining }} day(s) remaining</span>
{%- endif %}
        <span class="badge badge-renewed">{% if alert.renewed %}Renewed{% else %}Not renewed{% endif %}</span>
        <span class="badge badge-invoiced">{% if alert.invoiced %}Invoiced{% else %}Not invoiced{% endif %}</span>
      </div>
    </div>
{%- endfor %}
  </div>
{%- endif %}
{%- endfor %}
  <div class="footer">
    <p>Automated message from the compliance deadline tracker. Do not reply.</p>
  </div>
</body>
</html>
"#;

/// Flatten company alerts into per-priority rows, preserving order.
pub fn group_by_priority(companies: &[CompanyAlerts]) -> HashMap<Priority, Vec<AlertRow>> {
    let mut groups: HashMap<Priority, Vec<AlertRow>> = HashMap::new();
    for company in companies {
        for alert in &company.alerts {
            groups.entry(alert.priority).or_default().push(AlertRow {
                company_name: company.name.clone(),
                tax_id: company.tax_id.clone(),
                module: alert.module.clone(),
                reason: alert.reason.to_string(),
                end_date: alert.end_date.map(|d| d.to_string()),
                days_remaining: alert.days_remaining,
                renewed: alert.renewed,
                invoiced: alert.invoiced,
            });
        }
    }
    groups
}

/// Render the HTML digest for a set of company alerts.
pub fn render_digest(
    companies: &[CompanyAlerts],
    now: DateTime<Utc>,
) -> Result<String, NotifyError> {
    let mut groups = group_by_priority(companies);
    let critical = groups.remove(&Priority::Critical).unwrap_or_default();
    let high = groups.remove(&Priority::High).unwrap_or_default();
    let medium = groups.remove(&Priority::Medium).unwrap_or_default();

    let ctx = DigestContext {
        generated_on: now.format("%d/%m/%Y").to_string(),
        total: critical.len() + high.len() + medium.len(),
        critical,
        high,
        medium,
    };

    let mut env = minijinja::Environment::new();
    env.add_template("digest", DIGEST_TEMPLATE)
        .map_err(|e| NotifyError::Template(e.to_string()))?;
    let template = env
        .get_template("digest")
        .map_err(|e| NotifyError::Template(e.to_string()))?;
    template
        .render(minijinja::Value::from_serialize(&ctx))
        .map_err(|e| NotifyError::Template(e.to_string()))
}
