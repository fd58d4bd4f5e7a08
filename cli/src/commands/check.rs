use colored::Colorize;
use ship_defs::PipelineState;
use ship_pipeline::{run_preflight, CallLogInspector, CallLogs, HealthProbe, Verifier};

use crate::render::{print_calls, print_health, print_preflight, print_report};
use crate::utils::{advance, exit_with, Context};

pub async fn handle_doctor(ctx: &Context) {
    let checks = run_preflight(&ctx.deployer()).await;
    print_preflight(&checks);
    if checks.len() < 2 || checks.iter().any(|c| !c.passed) {
        std::process::exit(1);
    }
}

pub async fn handle_health(ctx: &Context, url: &str) {
    let base_url = ctx.base_url(Some(url));
    let probe = match HealthProbe::new(ctx.settings.health_timeout()) {
        Ok(probe) => probe,
        Err(e) => exit_with(&e),
    };
    let status = probe.probe(&base_url).await;
    print_health(&status);
    if let Err(e) = status.into_result() {
        exit_with(&e);
    }
}

pub async fn handle_verify(ctx: &Context, url: Option<&str>) {
    let base_url = ctx.base_url(url);
    let verifier = match Verifier::new(
        ctx.settings.verifier_checks(),
        ctx.settings.check_timeout(),
        ctx.settings.parallelism,
    ) {
        Ok(verifier) => verifier,
        Err(e) => exit_with(&e),
    };
    let report = verifier.verify(&base_url).await;
    print_report(&report);
    if let Err(e) = report.into_result() {
        exit_with(&e);
    }

    if url.is_none() {
        let mut record = ctx.record();
        if advance(&mut record, PipelineState::Verified) {
            ctx.save(&record);
        }
    }
}

pub async fn handle_calls(ctx: &Context, url: Option<&str>, limit: usize) {
    let base_url = ctx.base_url(url);
    let inspector = match CallLogInspector::new(ctx.settings.check_timeout()) {
        Ok(inspector) => inspector,
        Err(e) => exit_with(&e),
    };
    match inspector.recent(&base_url).await {
        Ok(CallLogs::Records(records)) => {
            let shown: Vec<_> = records.into_iter().take(limit).collect();
            print_calls(&shown);
            let complete = shown.iter().filter(|r| r.completeness().is_complete()).count();
            println!("\n{}/{} calls complete", complete, shown.len());
        }
        Ok(CallLogs::DatabaseNotConfigured) => {
            println!(
                "{} the bot reports no database; set POSTGRES_URL so calls land in {}",
                "WARN".yellow().bold(),
                ctx.settings.variant.call_log_table()
            );
        }
        Err(e) => exit_with(&e),
    }
}
