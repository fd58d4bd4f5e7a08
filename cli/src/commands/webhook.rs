use colored::Colorize;
use ship_defs::{DeployError, PipelineState, RebindOutcome};
use ship_pipeline::WebhookRebinder;

use crate::render::print_bindings;
use crate::utils::{advance, exit_with, Context};

pub async fn handle_rebind(ctx: &Context, url: Option<&str>, number: Option<&str>) {
    let base_url = ctx.base_url(url);
    let number = match number.or(ctx.settings.phone_number.as_deref()) {
        Some(number) => number.to_string(),
        None => exit_with(&DeployError::MissingPhoneNumber),
    };
    let telephony = ctx.telephony();

    match WebhookRebinder::new(&telephony).rebind(&number, &base_url).await {
        Ok(RebindOutcome::AlreadyCorrect(binding)) => {
            println!(
                "{} {} already correct: {}",
                "PASS".green().bold(),
                number,
                binding.describe()
            );
        }
        Ok(RebindOutcome::Updated { previous, current }) => {
            println!(
                "{} {} updated\n  before: {}\n  after:  {}",
                "PASS".green().bold(),
                number,
                previous.describe(),
                current.describe()
            );
        }
        Err(e) => exit_with(&e),
    }

    if url.is_none() {
        let mut record = ctx.record();
        if advance(&mut record, PipelineState::Rewired) {
            ctx.save(&record);
        }
    }
}

pub async fn handle_numbers(ctx: &Context) {
    let telephony = ctx.telephony();
    let domain = ctx.record().target.domain;
    match WebhookRebinder::new(&telephony)
        .list_bindings(domain.as_deref())
        .await
    {
        Ok(bindings) if bindings.is_empty() => println!("No phone numbers on this account"),
        Ok(bindings) => print_bindings(&bindings),
        Err(e) => exit_with(&e),
    }
}
