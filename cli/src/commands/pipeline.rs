use colored::Colorize;
use ship_defs::{ConfirmationSource, PipelineState};
use ship_pipeline::{
    AutoConfirm, Capabilities, EnvSecretSource, InquireConfirmation, Orchestrator,
    PipelineOptions, Verifier,
};

use crate::render::print_record;
use crate::utils::{cancel_on_ctrl_c, exit_with, exit_with_stage, Context};

pub async fn handle_deploy(ctx: &Context, yes: bool, from: Option<PipelineState>, no_prompt: bool) {
    let record = ctx.record();
    let deployer = ctx.deployer();
    let telephony = ctx.telephony();
    let secrets = EnvSecretSource::new(!no_prompt);
    let confirmation: Box<dyn ConfirmationSource> = if yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(InquireConfirmation)
    };
    let verifier = match Verifier::new(
        ctx.settings.verifier_checks(),
        ctx.settings.check_timeout(),
        ctx.settings.parallelism,
    ) {
        Ok(verifier) => verifier,
        Err(e) => exit_with(&e),
    };

    let mut options = PipelineOptions::from_settings(&ctx.settings);
    options.from = from;

    println!(
        "Deploying {} ({} variant) from state {}",
        record.target.display_name().bold(),
        options.descriptor.variant,
        record.state.to_string().bold()
    );
    let orchestrator = Orchestrator::new(
        Capabilities {
            deployer: &deployer,
            telephony: &telephony,
            confirmation: confirmation.as_ref(),
            secrets: &secrets,
            store: &ctx.store,
        },
        &verifier,
        options,
        cancel_on_ctrl_c(),
    );

    match orchestrator.run(record).await {
        Ok(record) => {
            println!("{}", "Deployment pipeline complete".green().bold());
            print_record(&record);
        }
        Err(e) => exit_with_stage(&e),
    }
}

pub fn handle_status(ctx: &Context, json: bool) {
    let record = ctx.record();
    if json {
        match serde_json::to_string_pretty(&record) {
            Ok(out) => println!("{}", out),
            Err(e) => exit_with(&ship_defs::DeployError::State(e.to_string())),
        }
        return;
    }
    print_record(&record);
    match record.state.next() {
        Some(next) => println!("Next stage: {} (run `callship deploy` to continue)", next),
        None => println!("Pipeline done; `callship deploy` re-confirms without changing anything"),
    }
}
