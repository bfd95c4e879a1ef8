//! Provider endpoint URL type.

use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::Error;

/// A validated OAI-PMH provider endpoint URL.
///
/// Must be an absolute `http` or `https` URL. Construction fails with
/// [`Error::BadEndpoint`] otherwise.
///
/// # Example
///
/// ```
/// use oaipmh_core::EndpointUrl;
///
/// let endpoint = EndpointUrl::new("https://example.org/oai").unwrap();
/// assert_eq!(endpoint.as_str(), "https://example.org/oai");
///
/// assert!(EndpointUrl::new("not a url").is_err());
/// assert!(EndpointUrl::new("/oai").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointUrl(Url);

impl EndpointUrl {
    /// Create a new endpoint URL from a string, validating the format.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| Error::BadEndpoint {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        if url.cannot_be_a_base() {
            return Err(Error::BadEndpoint {
                value: s.to_string(),
                reason: "must be an absolute URL".to_string(),
            });
        }

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Error::BadEndpoint {
                value: s.to_string(),
                reason: format!("unsupported scheme '{}'", scheme),
            });
        }

        if url.host_str().is_none() {
            return Err(Error::BadEndpoint {
                value: s.to_string(),
                reason: "must have a host".to_string(),
            });
        }

        Ok(Self(url))
    }

    /// Returns the URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EndpointUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for EndpointUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_https_url() {
        let endpoint = EndpointUrl::new("https://example.org/oai").unwrap();
        assert_eq!(endpoint.as_url().host_str(), Some("example.org"));
    }

    #[test]
    fn valid_http_url_with_port() {
        let endpoint = EndpointUrl::new("http://localhost:8080/").unwrap();
        assert_eq!(endpoint.as_url().port(), Some(8080));
    }

    #[test]
    fn rejects_relative_url() {
        assert!(matches!(
            EndpointUrl::new("/oai/provider"),
            Err(Error::BadEndpoint { .. })
        ));
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(EndpointUrl::new("ftp://example.org/oai").is_err());
        assert!(EndpointUrl::new("file:///tmp/oai").is_err());
    }
}
