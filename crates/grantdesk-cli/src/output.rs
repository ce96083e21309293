//! Terminal rendering

use grantdesk_core::{ConnectivityStatus, WorkspaceSnapshot};
use grantdesk_model::{FundingSummary, Grant, Project};
use std::fmt::Write;

/// Whole dollars with thousands separators
pub(crate) fn money(amount: f64) -> String {
    if !amount.is_finite() {
        return "$0".to_string();
    }
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}")
}

pub(crate) fn connectivity_line(status: &ConnectivityStatus) -> String {
    let state = if status.permission_denied {
        "access denied"
    } else if status.reachable {
        "connected"
    } else {
        "offline"
    };
    match &status.last_error {
        Some(error) if !status.reachable => format!("cloud: {state} ({error})"),
        _ => format!("cloud: {state}"),
    }
}

pub(crate) fn project_list(snapshot: &WorkspaceSnapshot) -> String {
    if snapshot.projects.is_empty() {
        return "no projects yet; run `grantdesk create <city>`".to_string();
    }
    let active = snapshot.activation.id();
    let mut out = String::new();
    for project in &snapshot.projects {
        let marker = if Some(&project.id) == active { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:<24} {:<20} {} grants",
            project.id.as_str(),
            project.city_name,
            project.potential_grants.len()
        );
    }
    out
}

fn grant_line(out: &mut String, grant: &Grant) {
    let _ = write!(
        out,
        "  [{}] {} ({}, up to {}) - {}",
        grant.id,
        grant.name,
        grant.level,
        money(grant.max_val),
        grant.status
    );
    if let Some(amount) = grant.confirmed_award_amount {
        let _ = write!(out, ", awarded {}", money(amount));
    } else if grant.needs_award_confirmation() {
        out.push_str(", award amount not confirmed");
    }
    if grant.has_source_link() {
        let _ = write!(out, "\n      {}", grant.source_link);
    }
    out.push('\n');
}

pub(crate) fn project_status(project: &Project, summary: &FundingSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({}) - {}", project.city_name, project.id, project.scale);
    if !project.priorities.is_empty() {
        let _ = writeln!(out, "priorities: {}", project.priorities.join("; "));
    }
    if !project.equity_goals.is_empty() {
        let _ = writeln!(out, "equity goals: {}", project.equity_goals);
    }
    if let Some(phases) = &project.phase_breakdown {
        let _ = writeln!(out, "phases: {phases}");
    }
    let _ = writeln!(
        out,
        "need {}  secured {}  gap {}  progress {:.0}%",
        money(summary.estimated_need),
        money(summary.secured),
        money(summary.gap),
        summary.progress_percent
    );
    let _ = writeln!(
        out,
        "identified potential {} ({:.0}% of need)",
        money(summary.total_potential),
        summary.potential_coverage_percent
    );
    for grant in &project.potential_grants {
        grant_line(&mut out, grant);
    }
    out
}
