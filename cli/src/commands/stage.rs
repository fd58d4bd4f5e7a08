use colored::Colorize;
use ship_defs::{ConfirmationSource, DeployError, Deployer, Gate, PipelineState, SecretKey};
use ship_pipeline::{
    ask_yes_no, confirm_gate, AutoConfirm, BuildDriver, ConfigurationBinder, DomainPublisher,
    EnvSecretSource, InquireConfirmation,
};

use crate::utils::{advance, cancel_on_ctrl_c, exit_with, Context};

pub async fn handle_link(ctx: &Context, yes: bool) {
    let mut record = ctx.record();
    let deployer = ctx.deployer();

    let confirmation: Box<dyn ConfirmationSource> = if yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(InquireConfirmation)
    };
    if let Err(e) = confirm_gate(&mut record, Gate::Link, confirmation.as_ref(), &ctx.store).await {
        exit_with(&e);
    }

    let status = match deployer.status(&record.target).await {
        Ok(Some(status)) => status,
        Ok(None) => exit_with(&DeployError::TargetNotLinked(
            record.target.workdir.display().to_string(),
        )),
        Err(e) => exit_with(&e),
    };
    record.target.apply_link(&status);
    advance(&mut record, PipelineState::Linked);
    ctx.save(&record);

    println!(
        "Linked {} to {} ({})",
        record.target.workdir.display(),
        record.target.display_name().bold(),
        status.environment.as_deref().unwrap_or("default environment")
    );
}

pub async fn handle_secrets(ctx: &Context, no_prompt: bool) {
    let mut record = ctx.record();
    let deployer = ctx.deployer();
    let secrets = EnvSecretSource::new(!no_prompt);
    let required = SecretKey::required_for(ctx.settings.variant);

    match ConfigurationBinder::new(&deployer, &secrets)
        .bind(&record.target, required)
        .await
    {
        Ok(summary) => {
            for key in &summary.already_set {
                println!("{} {} (already set)", "PASS".green().bold(), key);
            }
            for key in &summary.newly_set {
                println!("{} {} (set now)", "PASS".green().bold(), key);
            }
        }
        Err(e) => exit_with(&e),
    }

    record.confirmed_gates.insert(Gate::Secrets);
    advance(&mut record, PipelineState::Configured);
    ctx.save(&record);
}

pub async fn handle_up(ctx: &Context) {
    let mut record = ctx.record();
    let deployer = ctx.deployer();
    let descriptor = ctx.settings.descriptor();

    let handle = match BuildDriver::new(&deployer)
        .release(&record.target, &descriptor, cancel_on_ctrl_c())
        .await
    {
        Ok(handle) => handle,
        Err(e) => exit_with(&e),
    };
    println!(
        "{} released {} from {}",
        "PASS".green().bold(),
        handle.deployment_id.as_deref().unwrap_or("deployment"),
        handle.descriptor.display()
    );
    if let Some(url) = &handle.build_logs_url {
        println!("Build logs: {}", url);
    }

    record.variant = descriptor.variant;
    record.release = Some(handle);
    advance(&mut record, PipelineState::Deployed);
    ctx.save(&record);
}

pub async fn handle_domain(ctx: &Context) {
    let mut record = ctx.record();
    let deployer = ctx.deployer();
    let domain = match DomainPublisher::new(&deployer).publish(&record.target).await {
        Ok(domain) => domain,
        Err(e) => exit_with(&e),
    };
    println!("{}", domain.bold());

    record.target.domain = Some(domain);
    advance(&mut record, PipelineState::Published);
    ctx.save(&record);
}

pub async fn handle_logs(ctx: &Context) {
    let record = ctx.record();
    println!("Streaming logs for {} (Ctrl-C to stop)", record.target.display_name());
    if let Err(e) = ctx
        .deployer()
        .stream_logs(&record.target, cancel_on_ctrl_c())
        .await
    {
        exit_with(&e);
    }
}

/// Removes the latest deployment and rewinds the record so the next deploy rebuilds.
pub async fn handle_down(ctx: &Context, yes: bool) {
    let mut record = ctx.record();
    if !yes {
        let prompt = format!(
            "Remove the latest deployment of {}?",
            record.target.display_name()
        );
        match ask_yes_no(&prompt).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => exit_with(&e),
        }
    }
    if let Err(e) = ctx.deployer().down(&record.target).await {
        exit_with(&e);
    }
    record.rewind_to(PipelineState::Configured);
    ctx.save(&record);
    println!("Deployment removed; pipeline is back at {}", record.state);
}
