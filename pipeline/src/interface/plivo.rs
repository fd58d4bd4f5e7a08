use std::time::Duration;

use async_trait::async_trait;
use http_client::HttpClient;
use serde::Deserialize;
use serde_json::json;
use ship_defs::{DeployError, HttpMethod, SecretKey, TelephonyProvider, WebhookBinding};

use crate::settings::PlivoSettings;

#[derive(Debug, Deserialize)]
struct PlivoNumber {
    number: String,
    #[serde(default)]
    answer_url: Option<String>,
    #[serde(default)]
    answer_method: Option<String>,
}

impl From<PlivoNumber> for WebhookBinding {
    fn from(n: PlivoNumber) -> Self {
        WebhookBinding {
            number: n.number,
            answer_url: n.answer_url.filter(|u| !u.is_empty()),
            answer_method: n.answer_method.and_then(|m| m.parse().ok()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlivoNumberList {
    objects: Vec<PlivoNumber>,
}

/// Plivo number management over its REST API.
pub struct PlivoClient {
    http: HttpClient,
    api_base: String,
    credentials: Option<(String, String)>,
}

impl PlivoClient {
    /// Missing credentials are reported when the API is first used.
    pub fn new(settings: &PlivoSettings, timeout: Duration) -> Result<Self, DeployError> {
        let credentials = match (&settings.auth_id, &settings.auth_token) {
            (Some(id), Some(token)) => Some((id.clone(), token.clone())),
            _ => None,
        };
        Ok(PlivoClient {
            http: HttpClient::new(timeout)?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn credentials(&self) -> Result<(&str, &str), DeployError> {
        match &self.credentials {
            Some((id, token)) => Ok((id.as_str(), token.as_str())),
            None => Err(DeployError::ConfigurationIncomplete {
                missing: vec![
                    SecretKey::PlivoAuthId.to_string(),
                    SecretKey::PlivoAuthToken.to_string(),
                ],
            }),
        }
    }

    fn number_url(&self, auth_id: &str, number: &str) -> String {
        format!(
            "{}/Account/{}/Number/{}/",
            self.api_base,
            auth_id,
            normalize_number(number)
        )
    }

    async fn get(&self, url: &str) -> Result<http_client::HttpResponse, DeployError> {
        let (auth_id, auth_token) = self.credentials()?;
        let request = self.http.inner().get(url).basic_auth(auth_id, Some(auth_token));
        let response = self
            .http
            .send(url, request)
            .await
            .map_err(|e| DeployError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if !response.is_success() {
            return Err(DeployError::Http {
                url: url.to_string(),
                reason: format!("HTTP {}: {}", response.status, response.body.trim()),
            });
        }
        Ok(response)
    }
}

/// Plivo addresses numbers without the leading `+`.
pub fn normalize_number(number: &str) -> String {
    number
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

#[async_trait]
impl TelephonyProvider for PlivoClient {
    async fn get_binding(&self, number: &str) -> Result<WebhookBinding, DeployError> {
        let (auth_id, _) = self.credentials()?;
        let url = self.number_url(auth_id, number);
        let response = self.get(&url).await?;
        let parsed: PlivoNumber = response.json().map_err(|e| DeployError::Http {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        Ok(parsed.into())
    }

    async fn update_binding(
        &self,
        number: &str,
        answer_url: &str,
        method: HttpMethod,
    ) -> Result<(), DeployError> {
        let (auth_id, auth_token) = self.credentials()?;
        let url = self.number_url(auth_id, number);
        let request = self
            .http
            .inner()
            .post(&url)
            .basic_auth(auth_id, Some(auth_token))
            .json(&json!({
                "answer_url": answer_url,
                "answer_method": method.as_str(),
            }));
        let response =
            self.http
                .send(&url, request)
                .await
                .map_err(|e| DeployError::RebindWriteFailed {
                    number: number.to_string(),
                    reason: e.to_string(),
                })?;
        if !response.is_success() {
            return Err(DeployError::RebindWriteFailed {
                number: number.to_string(),
                reason: format!("HTTP {}: {}", response.status, response.body.trim()),
            });
        }
        Ok(())
    }

    async fn list_bindings(&self) -> Result<Vec<WebhookBinding>, DeployError> {
        let (auth_id, _) = self.credentials()?;
        let url = format!(
            "{}/Account/{}/Number/?limit=20&offset=0",
            self.api_base, auth_id
        );
        let response = self.get(&url).await?;
        let parsed: PlivoNumberList = response.json().map_err(|e| DeployError::Http {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        Ok(parsed.objects.into_iter().map(WebhookBinding::from).collect())
    }
}
