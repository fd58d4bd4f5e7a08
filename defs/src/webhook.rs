use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(format!("unsupported method '{}'", other)),
        }
    }
}

/// The provider's stored callback for one phone number.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WebhookBinding {
    pub number: String,
    pub answer_url: Option<String>,
    pub answer_method: Option<HttpMethod>,
}

impl WebhookBinding {
    pub fn matches(&self, answer_url: &str, method: HttpMethod) -> bool {
        self.answer_url.as_deref() == Some(answer_url) && self.answer_method == Some(method)
    }

    pub fn describe(&self) -> String {
        format!(
            "{} {}",
            self.answer_method
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.answer_url.as_deref().unwrap_or("(not set)")
        )
    }

    pub fn classify(&self, deployed_domain: Option<&str>) -> BindingClass {
        let Some(url) = self.answer_url.as_deref().filter(|u| !u.is_empty()) else {
            return BindingClass::Unset;
        };
        let lowered = url.to_lowercase();
        if let Some(domain) = deployed_domain {
            if lowered.contains(&domain.to_lowercase()) {
                return BindingClass::Deployed;
            }
        }
        if lowered.contains("ngrok") {
            return BindingClass::Tunnel;
        }
        BindingClass::Other
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingClass {
    Deployed,
    Tunnel,
    Other,
    Unset,
}

impl std::fmt::Display for BindingClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingClass::Deployed => write!(f, "DEPLOYED"),
            BindingClass::Tunnel => write!(f, "TUNNEL (update needed)"),
            BindingClass::Other => write!(f, "OTHER"),
            BindingClass::Unset => write!(f, "NOT SET"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RebindOutcome {
    AlreadyCorrect(WebhookBinding),
    Updated {
        previous: WebhookBinding,
        current: WebhookBinding,
    },
}
