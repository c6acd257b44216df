// src/linkedin.rs
//! LinkedIn URL classification and normalization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkedInKind {
    Profile,
    Company,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedInUrl {
    pub kind: LinkedInKind,
    pub slug: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkedInUrlError {
    #[error("LinkedIn URL is empty")]
    Empty,

    #[error("Not a LinkedIn URL: {0}")]
    NotLinkedIn(String),

    #[error("Legacy LinkedIn profile URL format is not supported: {0}. Use the /in/<name> form")]
    LegacyProfile(String),

    #[error("Unsupported LinkedIn URL: {0}")]
    Unsupported(String),

    #[error("Expected a {expected} URL, got: {url}")]
    WrongKind { expected: &'static str, url: String },
}

impl LinkedInUrl {
    /// Canonical form stored in the database.
    pub fn normalized(&self) -> String {
        match self.kind {
            LinkedInKind::Profile => format!("https://www.linkedin.com/in/{}", self.slug),
            LinkedInKind::Company => format!("https://www.linkedin.com/company/{}", self.slug),
        }
    }
}

/// Parses any LinkedIn profile or company URL.
pub fn parse(raw: &str) -> Result<LinkedInUrl, LinkedInUrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LinkedInUrlError::Empty);
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let without_query = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);

    let (host, path) = match without_query.find('/') {
        Some(idx) => (&without_query[..idx], &without_query[idx..]),
        None => (without_query, ""),
    };

    let host = host.to_lowercase();
    if host != "linkedin.com" && !host.ends_with(".linkedin.com") {
        return Err(LinkedInUrlError::NotLinkedIn(trimmed.to_string()));
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (kind, slug) = match segments.as_slice() {
        ["pub", ..] => return Err(LinkedInUrlError::LegacyProfile(trimmed.to_string())),
        ["in", slug, ..] => (LinkedInKind::Profile, *slug),
        ["company", slug, ..] => (LinkedInKind::Company, *slug),
        _ => return Err(LinkedInUrlError::Unsupported(trimmed.to_string())),
    };

    if !is_valid_slug(slug) {
        return Err(LinkedInUrlError::Unsupported(trimmed.to_string()));
    }

    Ok(LinkedInUrl {
        kind,
        slug: slug.to_lowercase(),
    })
}

/// Parses a URL and requires it to point at a member profile.
pub fn parse_profile(raw: &str) -> Result<LinkedInUrl, LinkedInUrlError> {
    expect_kind(parse(raw)?, LinkedInKind::Profile, "profile", raw)
}

/// Parses a URL and requires it to point at a company page.
pub fn parse_company(raw: &str) -> Result<LinkedInUrl, LinkedInUrlError> {
    expect_kind(parse(raw)?, LinkedInKind::Company, "company", raw)
}

fn expect_kind(
    url: LinkedInUrl,
    kind: LinkedInKind,
    expected: &'static str,
    raw: &str,
) -> Result<LinkedInUrl, LinkedInUrlError> {
    if url.kind == kind {
        Ok(url)
    } else {
        Err(LinkedInUrlError::WrongKind {
            expected,
            url: raw.trim().to_string(),
        })
    }
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '%' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_profile_url() {
        let url = parse("https://www.linkedin.com/in/Jane-Doe-123/").unwrap();
        assert_eq!(url.kind, LinkedInKind::Profile);
        assert_eq!(url.normalized(), "https://www.linkedin.com/in/jane-doe-123");
    }

    #[test]
    fn test_profile_url_without_scheme_or_with_query() {
        let url = parse("linkedin.com/in/janedoe?trk=public_profile").unwrap();
        assert_eq!(url.normalized(), "https://www.linkedin.com/in/janedoe");

        let url = parse("http://fr.linkedin.com/in/janedoe/details/experience/").unwrap();
        assert_eq!(url.slug, "janedoe");
    }

    #[test]
    fn test_legacy_pub_url_rejected() {
        let err = parse("https://www.linkedin.com/pub/john-smith/8/946/143").unwrap_err();
        assert!(matches!(err, LinkedInUrlError::LegacyProfile(_)));
    }

    #[test]
    fn test_company_url() {
        let url = parse_company("https://www.linkedin.com/company/acme-corp/about/").unwrap();
        assert_eq!(url.normalized(), "https://www.linkedin.com/company/acme-corp");
        assert!(matches!(
            parse_profile("https://www.linkedin.com/company/acme-corp"),
            Err(LinkedInUrlError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_rejects_other_hosts_and_paths() {
        assert!(matches!(
            parse("https://example.com/in/jane"),
            Err(LinkedInUrlError::NotLinkedIn(_))
        ));
        assert!(matches!(
            parse("https://evil-linkedin.com/in/jane"),
            Err(LinkedInUrlError::NotLinkedIn(_))
        ));
        assert!(matches!(
            parse("https://www.linkedin.com/feed/"),
            Err(LinkedInUrlError::Unsupported(_))
        ));
        assert!(matches!(parse("https://www.linkedin.com/in/"), Err(LinkedInUrlError::Unsupported(_))));
        assert_eq!(parse("   "), Err(LinkedInUrlError::Empty));
    }
}
