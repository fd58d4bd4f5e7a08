use anyhow::{anyhow, Result};
use url::Url;

/// Strips scheme, path and trailing slash: `https://a.up.example/` -> `a.up.example`.
pub fn normalize_domain(s: &str) -> String {
    let trimmed = s.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn base_url_for_domain(domain: &str, scheme: &str) -> String {
    format!("{}://{}", scheme, normalize_domain(domain))
}

/// Validates an operator-supplied base URL and drops any trailing slash.
pub fn parse_base_url(s: &str) -> Result<String> {
    let candidate = if s.contains("://") {
        s.trim().to_string()
    } else {
        format!("https://{}", s.trim())
    };
    let url = Url::parse(&candidate).map_err(|e| anyhow!("Invalid URL '{}': {}", s, e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Unsupported scheme '{}' in '{}'", other, s)),
    }
    if url.host_str().is_none() {
        return Err(anyhow!("URL '{}' has no host", s));
    }
    Ok(candidate.trim_end_matches('/').to_string())
}

pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    format!("{}...", s.chars().take(max_chars).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_domain_strips_scheme_and_path() {
        assert_eq!(
            normalize_domain("https://demo.up.example/"),
            "demo.up.example"
        );
        assert_eq!(normalize_domain("demo.up.example"), "demo.up.example");
        assert_eq!(
            normalize_domain("http://127.0.0.1:8000/answer"),
            "127.0.0.1:8000"
        );
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://demo.up.example/", "/answer"),
            "https://demo.up.example/answer"
        );
        assert_eq!(join_url("https://demo.up.example", ""), "https://demo.up.example/");
    }

    #[test]
    fn test_parse_base_url_defaults_to_https() {
        assert_eq!(
            parse_base_url("demo.up.example/").unwrap(),
            "https://demo.up.example"
        );
        assert_eq!(
            parse_base_url("http://localhost:8000").unwrap(),
            "http://localhost:8000"
        );
        assert!(parse_base_url("ftp://demo.up.example").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
