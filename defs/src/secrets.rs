use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::BuildVariant;

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SecretKey {
    #[serde(rename = "OPENAI_API_KEY")]
    OpenaiApiKey,
    #[serde(rename = "DEEPGRAM_API_KEY")]
    DeepgramApiKey,
    #[serde(rename = "ELEVENLABS_API_KEY")]
    ElevenlabsApiKey,
    #[serde(rename = "PLIVO_AUTH_ID")]
    PlivoAuthId,
    #[serde(rename = "PLIVO_AUTH_TOKEN")]
    PlivoAuthToken,
    #[serde(rename = "POSTGRES_URL")]
    PostgresUrl,
    #[serde(rename = "LIVEKIT_API_KEY")]
    LivekitApiKey,
    #[serde(rename = "LIVEKIT_API_SECRET")]
    LivekitApiSecret,
    #[serde(rename = "LIVEKIT_URL")]
    LivekitUrl,
}

const PIPELINE_KEYS: &[SecretKey] = &[
    SecretKey::OpenaiApiKey,
    SecretKey::DeepgramApiKey,
    SecretKey::ElevenlabsApiKey,
    SecretKey::PlivoAuthId,
    SecretKey::PlivoAuthToken,
    SecretKey::PostgresUrl,
];

const AGENT_KEYS: &[SecretKey] = &[
    SecretKey::OpenaiApiKey,
    SecretKey::DeepgramApiKey,
    SecretKey::ElevenlabsApiKey,
    SecretKey::PostgresUrl,
    SecretKey::LivekitApiKey,
    SecretKey::LivekitApiSecret,
    SecretKey::LivekitUrl,
];

impl SecretKey {
    pub const ALL: [SecretKey; 9] = [
        SecretKey::OpenaiApiKey,
        SecretKey::DeepgramApiKey,
        SecretKey::ElevenlabsApiKey,
        SecretKey::PlivoAuthId,
        SecretKey::PlivoAuthToken,
        SecretKey::PostgresUrl,
        SecretKey::LivekitApiKey,
        SecretKey::LivekitApiSecret,
        SecretKey::LivekitUrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKey::OpenaiApiKey => "OPENAI_API_KEY",
            SecretKey::DeepgramApiKey => "DEEPGRAM_API_KEY",
            SecretKey::ElevenlabsApiKey => "ELEVENLABS_API_KEY",
            SecretKey::PlivoAuthId => "PLIVO_AUTH_ID",
            SecretKey::PlivoAuthToken => "PLIVO_AUTH_TOKEN",
            SecretKey::PostgresUrl => "POSTGRES_URL",
            SecretKey::LivekitApiKey => "LIVEKIT_API_KEY",
            SecretKey::LivekitApiSecret => "LIVEKIT_API_SECRET",
            SecretKey::LivekitUrl => "LIVEKIT_URL",
        }
    }

    pub fn required_for(variant: BuildVariant) -> &'static [SecretKey] {
        match variant {
            BuildVariant::Pipeline => PIPELINE_KEYS,
            BuildVariant::Agent => AGENT_KEYS,
        }
    }
}

impl std::fmt::Display for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SecretKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecretKey::ALL
            .iter()
            .find(|key| key.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown secret key '{}'", s))
    }
}

/// An opaque secret. Only a masked preview is ever formatted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        SecretValue(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn masked(&self) -> String {
        let len = self.0.chars().count();
        if len <= 8 {
            return format!("****({} chars)", len);
        }
        let head: String = self.0.chars().take(4).collect();
        format!("{}…({} chars)", head, len)
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretValue({})", self.masked())
    }
}

impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecretSet {
    values: BTreeMap<SecretKey, SecretValue>,
}

impl SecretSet {
    pub fn new() -> Self {
        SecretSet::default()
    }

    pub fn insert(&mut self, key: SecretKey, value: SecretValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: SecretKey) -> Option<&SecretValue> {
        self.values.get(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = SecretKey> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SecretKey, &SecretValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
