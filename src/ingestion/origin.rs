//! Origin extraction and authorized-domain matching.

use url::Url;

/// Extracts a lowercase hostname from an `Origin` or `Referer` style value.
///
/// Accepts full URLs and bare hostnames; scheme, port and path are dropped.
/// Returns `None` when nothing hostname-shaped can be recovered.
pub fn extract_hostname(origin: &str) -> Option<String> {
    let trimmed = origin.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        // Bare hostnames ("app.example.com:3000") need a scheme to parse.
        format!("https://{trimmed}")
    };

    Url::parse(&candidate)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_ascii_lowercase()))
}

/// Checks a request hostname against an authorized domain pattern.
///
/// `*` authorizes anything. `*.suffix` authorizes `suffix` itself and any
/// subdomain of it on a dot boundary, so `otherexample.com` never matches
/// `*.example.com`. Everything else is an exact case-insensitive match.
pub fn domain_matches(pattern: &str, hostname: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let hostname = hostname.to_ascii_lowercase();

    if pattern == "*" {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return hostname == suffix || hostname.ends_with(&format!(".{suffix}"));
    }
    pattern == hostname
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_hostnames_from_urls_and_bare_hosts() {
        assert_eq!(
            extract_hostname("https://App.Example.com:3000/checkout"),
            Some("app.example.com".to_string())
        );
        assert_eq!(
            extract_hostname("app.example.com:3000"),
            Some("app.example.com".to_string())
        );
        assert_eq!(
            extract_hostname("http://localhost:5173"),
            Some("localhost".to_string())
        );
        assert_eq!(extract_hostname(""), None);
        assert_eq!(extract_hostname("   "), None);
    }

    #[test]
    fn wildcard_authorizes_any_origin() {
        assert!(domain_matches("*", "app.example.com"));
        assert!(domain_matches("*", "localhost"));
    }

    #[test]
    fn suffix_wildcard_respects_dot_boundary() {
        assert!(domain_matches("*.example.com", "app.example.com"));
        assert!(domain_matches("*.example.com", "a.b.example.com"));
        assert!(domain_matches("*.example.com", "example.com"));
        assert!(!domain_matches("*.example.com", "otherexample.com"));
        assert!(!domain_matches("*.example.com", "example.com.evil.net"));
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        assert!(domain_matches("App.Example.com", "app.example.com"));
        assert!(!domain_matches("app.example.com", "api.example.com"));
    }
}
