use log::info;
use ship_defs::{
    BindingClass, DeployError, HttpMethod, RebindOutcome, TelephonyProvider, WebhookBinding,
};
use ship_utils::join_url;

pub const ANSWER_PATH: &str = "/answer";

/// Points a number's answer URL at the deployment: read, compare, write, read back.
pub struct WebhookRebinder<'a> {
    telephony: &'a dyn TelephonyProvider,
}

impl<'a> WebhookRebinder<'a> {
    pub fn new(telephony: &'a dyn TelephonyProvider) -> Self {
        WebhookRebinder { telephony }
    }

    pub async fn rebind(&self, number: &str, base_url: &str) -> Result<RebindOutcome, DeployError> {
        if number.trim().is_empty() {
            return Err(DeployError::MissingPhoneNumber);
        }
        let answer_url = answer_url_for(base_url);

        let previous = self.telephony.get_binding(number).await?;
        if previous.matches(&answer_url, HttpMethod::Post) {
            info!("{} already answers at {}", number, answer_url);
            return Ok(RebindOutcome::AlreadyCorrect(previous));
        }

        info!(
            "Updating {} from {} to POST {}",
            number,
            previous.describe(),
            answer_url
        );
        self.telephony
            .update_binding(number, &answer_url, HttpMethod::Post)
            .await?;

        let current = self.telephony.get_binding(number).await?;
        if !current.matches(&answer_url, HttpMethod::Post) {
            return Err(DeployError::RebindVerificationFailed {
                number: number.to_string(),
                expected: format!("POST {}", answer_url),
                actual: current.describe(),
            });
        }
        Ok(RebindOutcome::Updated { previous, current })
    }

    /// Read-only check used when the pipeline is already done.
    pub async fn confirm(&self, number: &str, base_url: &str) -> Result<WebhookBinding, DeployError> {
        if number.trim().is_empty() {
            return Err(DeployError::MissingPhoneNumber);
        }
        let answer_url = answer_url_for(base_url);
        let binding = self.telephony.get_binding(number).await?;
        if binding.matches(&answer_url, HttpMethod::Post) {
            Ok(binding)
        } else {
            Err(DeployError::RebindVerificationFailed {
                number: number.to_string(),
                expected: format!("POST {}", answer_url),
                actual: binding.describe(),
            })
        }
    }

    /// Every number on the account with where its answer URL points.
    pub async fn list_bindings(
        &self,
        deployed_domain: Option<&str>,
    ) -> Result<Vec<(WebhookBinding, BindingClass)>, DeployError> {
        let bindings = self.telephony.list_bindings().await?;
        Ok(bindings
            .into_iter()
            .map(|binding| {
                let class = binding.classify(deployed_domain);
                (binding, class)
            })
            .collect())
    }
}

pub fn answer_url_for(base_url: &str) -> String {
    join_url(base_url, ANSWER_PATH)
}
