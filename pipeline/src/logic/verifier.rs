use std::time::Duration;

use futures::{stream, StreamExt};
use http_client::{HttpClient, HttpResponse};
use log::{info, warn};
use ship_defs::{
    CheckResult, DeployError, EndpointCheck, Expectation, HttpMethod, VerificationReport,
};
use ship_utils::{join_url, truncate};

use super::health_probe::evaluate_health;

const TEST_CALLER: &str = "+15551234567";
const TEST_CALLEE: &str = "+15559876543";

/// Runs every check against a base URL. Checks are independent: all of them
/// are attempted and the report keeps their declared order.
pub struct Verifier {
    http: HttpClient,
    checks: Vec<EndpointCheck>,
    parallelism: usize,
}

impl Verifier {
    pub fn new(
        checks: Vec<EndpointCheck>,
        timeout: Duration,
        parallelism: usize,
    ) -> Result<Self, DeployError> {
        Ok(Verifier {
            http: HttpClient::new(timeout)?,
            checks,
            parallelism: parallelism.max(1),
        })
    }

    pub async fn verify(&self, base_url: &str) -> VerificationReport {
        info!(
            "Verifying {} with {} checks ({} at a time)",
            base_url,
            self.checks.len(),
            self.parallelism
        );
        // `buffered` yields in input order whatever order the requests finish in.
        let checks = stream::iter(self.checks.iter())
            .map(|check| self.run_check(base_url, check))
            .buffered(self.parallelism)
            .collect::<Vec<_>>()
            .await;

        VerificationReport {
            base_url: base_url.to_string(),
            checks,
        }
    }

    async fn run_check(&self, base_url: &str, check: &EndpointCheck) -> CheckResult {
        let url = join_url(base_url, &check.path);
        let response = match check.method {
            HttpMethod::Get => self.http.get(&url).await,
            HttpMethod::Post if check.call_form => self.http.post_form(&url, &answer_form()).await,
            HttpMethod::Post => self.http.post_form(&url, &[]).await,
        };
        match response {
            Ok(response) => evaluate_check(check, &url, &response),
            Err(e) => CheckResult {
                name: check.name.clone(),
                method: check.method,
                url,
                passed: false,
                status_code: None,
                message: Some(e.to_string()),
                warning: false,
            },
        }
    }
}

/// What the provider posts to the answer URL when a call comes in.
fn answer_form() -> Vec<(&'static str, String)> {
    vec![
        ("CallUUID", uuid::Uuid::new_v4().to_string()),
        ("From", TEST_CALLER.to_string()),
        ("To", TEST_CALLEE.to_string()),
        ("Direction", "inbound".to_string()),
    ]
}

pub fn evaluate_check(check: &EndpointCheck, url: &str, response: &HttpResponse) -> CheckResult {
    let status = response.status;
    let (passed, message, warning) = match check.expect {
        Expectation::Healthy => {
            let health = evaluate_health(url, response);
            match health.failure_reason() {
                None => (
                    true,
                    Some(format!(
                        "{} {}",
                        health.service.unwrap_or_else(|| "service".to_string()),
                        health.version.unwrap_or_default()
                    )
                    .trim()
                    .to_string()),
                    false,
                ),
                Some(reason) => (false, Some(reason), false),
            }
        }
        Expectation::Success => {
            if response.is_success_or_redirect() {
                (true, None, false)
            } else {
                (false, Some(body_message(response)), false)
            }
        }
        Expectation::NoServerError => {
            if response.is_server_error() {
                (false, Some(body_message(response)), false)
            } else {
                (true, None, false)
            }
        }
        Expectation::NoServerErrorAllowUnavailable => match status {
            503 => {
                warn!("{} returned 503, database not configured", url);
                (true, Some("database not configured".to_string()), true)
            }
            s if s >= 500 => (false, Some(body_message(response)), false),
            _ => (true, None, false),
        },
    };

    CheckResult {
        name: check.name.clone(),
        method: check.method,
        url: url.to_string(),
        passed,
        status_code: Some(status),
        message,
        warning,
    }
}

fn body_message(response: &HttpResponse) -> String {
    let body = response.body.trim();
    if body.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        format!("HTTP {}: {}", response.status, truncate(body, 120))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::default_checks;
    use pretty_assertions::assert_eq;
    use ship_defs::{ANSWER_CHECK, LOGS_CHECK};

    fn check(name: &str) -> EndpointCheck {
        default_checks()
            .into_iter()
            .find(|c| c.name == name)
            .unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_answer_accepts_redirect() {
        let result = evaluate_check(
            &check(ANSWER_CHECK),
            "https://demo.up.example/answer",
            &response(302, ""),
        );
        assert!(result.passed);
    }

    #[test]
    fn test_answer_server_error_fails() {
        let result = evaluate_check(
            &check(ANSWER_CHECK),
            "https://demo.up.example/answer",
            &response(500, "Internal Server Error"),
        );
        assert!(!result.passed);
        assert_eq!(result.status_code, Some(500));
        assert_eq!(
            result.message.as_deref(),
            Some("HTTP 500: Internal Server Error")
        );
    }

    #[test]
    fn test_logs_unavailable_is_warning() {
        let result = evaluate_check(
            &check(LOGS_CHECK),
            "https://demo.up.example/logs",
            &response(503, r#"{"detail":"Database not configured"}"#),
        );
        assert!(result.passed);
        assert!(result.warning);
    }

    #[test]
    fn test_not_found_is_not_server_error() {
        let extra = EndpointCheck {
            name: "docs endpoint".to_string(),
            method: HttpMethod::Get,
            path: "/docs".to_string(),
            expect: Expectation::NoServerError,
            call_form: false,
        };
        let result = evaluate_check(&extra, "https://demo.up.example/docs", &response(404, ""));
        assert!(result.passed);
    }

    #[test]
    fn test_answer_form_is_provider_shaped() {
        let form = answer_form();
        let keys: Vec<&str> = form.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["CallUUID", "From", "To", "Direction"]);
        assert_eq!(form[0].1.len(), 36);
    }

    #[tokio::test]
    async fn test_unreachable_base_fails_every_check_in_order() {
        let verifier = Verifier::new(default_checks(), Duration::from_secs(1), 2).unwrap();
        let report = verifier.verify("http://127.0.0.1:9").await;
        let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "health endpoint",
                "answer endpoint",
                "root endpoint",
                "logs endpoint"
            ]
        );
        assert!(report.checks.iter().all(|c| !c.passed));
        assert!(!report.passed());
    }
}
