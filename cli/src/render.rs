use colored::Colorize;
use prettytable::{row, Table};
use ship_defs::{
    BindingClass, CallLogRecord, HealthStatus, PipelineRecord, VerificationReport, WebhookBinding,
};
use ship_pipeline::PreflightCheck;
use ship_utils::truncate;

fn marker(passed: bool, warning: bool) -> colored::ColoredString {
    match (passed, warning) {
        (true, false) => "PASS".green().bold(),
        (true, true) => "WARN".yellow().bold(),
        (false, _) => "FAIL".red().bold(),
    }
}

pub fn print_preflight(checks: &[PreflightCheck]) {
    for check in checks {
        println!("{} {}: {}", marker(check.passed, false), check.name, check.detail);
    }
}

pub fn print_health(status: &HealthStatus) {
    println!("{} {}", marker(status.healthy, false), status.url);
    println!("  reachable: {}", status.reachable);
    println!("  healthy:   {}", status.healthy);
    if let Some(code) = status.status_code {
        println!("  status:    {}", code);
    }
    if let Some(service) = &status.service {
        println!("  service:   {}", service);
    }
    if let Some(version) = &status.version {
        println!("  version:   {}", version);
    }
    if let Some(reason) = status.failure_reason() {
        println!("  reason:    {}", reason);
    }
}

pub fn print_report(report: &VerificationReport) {
    println!("Verifying {}", report.base_url.bold());
    let mut table = Table::new();
    table.add_row(row![
        "Check".blue().bold(),
        "Request".blue().bold(),
        "Status".blue().bold(),
        "Result".blue().bold(),
        "Detail".blue().bold(),
    ]);
    for check in &report.checks {
        table.add_row(row![
            check.name,
            format!("{} {}", check.method, check.url),
            check
                .status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            marker(check.passed, check.warning),
            truncate(check.message.as_deref().unwrap_or(""), 60),
        ]);
    }
    table.printstd();

    let passed = report.checks.iter().filter(|c| c.passed).count();
    let summary = format!("{}/{} checks passed", passed, report.checks.len());
    if report.passed() {
        println!("{}", summary.green().bold());
    } else {
        println!("{}", summary.red().bold());
    }
}

pub fn print_bindings(bindings: &[(WebhookBinding, BindingClass)]) {
    let mut table = Table::new();
    table.add_row(row![
        "Number".purple().bold(),
        "Answer URL".blue().bold(),
        "Method".blue().bold(),
        "Points at".green().bold(),
    ]);
    for (binding, class) in bindings {
        let class = match class {
            BindingClass::Deployed => class.to_string().green(),
            BindingClass::Tunnel => class.to_string().yellow(),
            BindingClass::Other => class.to_string().normal(),
            BindingClass::Unset => class.to_string().red(),
        };
        table.add_row(row![
            binding.number,
            binding.answer_url.as_deref().unwrap_or("(not set)"),
            binding
                .answer_method
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
            class,
        ]);
    }
    table.printstd();
}

pub fn print_calls(records: &[CallLogRecord]) {
    if records.is_empty() {
        println!("No calls recorded yet. Place a test call to the number.");
        return;
    }
    for record in records {
        let completeness = record.completeness();
        println!(
            "\nCall #{} at {}",
            record.id,
            record.timestamp.as_deref().unwrap_or("unknown time")
        );
        println!(
            "  {} caller:     {}",
            marker(completeness.has_caller, false),
            record.caller_number.as_deref().unwrap_or("-")
        );
        println!(
            "  {} transcript: {}",
            marker(completeness.has_transcript, false),
            truncate(record.transcript.as_deref().unwrap_or("-"), 80)
        );
        println!(
            "  {} intent:     {}",
            marker(completeness.has_intent, false),
            record.detected_intent.as_deref().unwrap_or("-")
        );
        println!(
            "  {} duration:   {}s",
            marker(completeness.has_duration, false),
            record.duration_seconds.unwrap_or(0)
        );
    }
}

pub fn print_record(record: &PipelineRecord) {
    let mut table = Table::new();
    table.add_row(row!["Workdir".bold(), record.target.workdir.display()]);
    table.add_row(row!["Project".bold(), record.target.display_name()]);
    table.add_row(row![
        "Environment".bold(),
        record.target.environment.as_deref().unwrap_or("-")
    ]);
    table.add_row(row!["Variant".bold(), record.variant]);
    table.add_row(row!["State".bold(), record.state.to_string().green().bold()]);
    table.add_row(row![
        "Domain".bold(),
        record.target.domain.as_deref().unwrap_or("-")
    ]);
    table.add_row(row![
        "Release".bold(),
        record
            .release
            .as_ref()
            .map(|r| format!(
                "{} at {}",
                r.deployment_id.as_deref().unwrap_or("unknown"),
                r.finished_at
            ))
            .unwrap_or_else(|| "-".to_string())
    ]);
    table.add_row(row![
        "Confirmed gates".bold(),
        record
            .confirmed_gates
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ]);
    table.add_row(row!["Updated".bold(), record.updated_at]);
    table.printstd();
}
