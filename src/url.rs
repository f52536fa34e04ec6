//! URL helpers for domain extraction
//!
//! Rate limiting and circuit breaking are keyed by the network host of a
//! target URL; this module is the single place that extraction happens.

use url::Url;

/// Extracts the domain from a parsed URL
///
/// Returns the host portion converted to lowercase, or None for URLs
/// without a host (which shouldn't happen for valid HTTP(S) URLs).
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the domain from a URL string
///
/// Convenience wrapper that parses first. Returns None if the string is
/// not a valid absolute URL or has no host.
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(extract_domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://boards.example.com/acme/jobs").unwrap();
        assert_eq!(extract_domain(&url), Some("boards.example.com".to_string()));
    }

    #[test]
    fn test_extract_lowercases_host() {
        let url = Url::parse("https://Boards.EXAMPLE.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("boards.example.com".to_string()));
    }

    #[test]
    fn test_extract_ignores_port() {
        let url = Url::parse("http://127.0.0.1:8080/jobs").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_domain_of_valid() {
        assert_eq!(
            domain_of("https://jobs.example.io/listing?page=2"),
            Some("jobs.example.io".to_string())
        );
    }

    #[test]
    fn test_domain_of_invalid() {
        assert_eq!(domain_of("not a url"), None);
        assert_eq!(domain_of("/relative/path"), None);
    }
}
