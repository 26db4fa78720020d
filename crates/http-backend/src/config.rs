use std::fmt::Debug;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Builder for [`HttpConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HttpConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    no_proxy: bool,
}

impl HttpConfigBuilder {
    /// Creates a builder with the server's base URL, e.g.
    /// `http://127.0.0.1:5000`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// Sets a timeout applied to every request.
    ///
    /// Without a timeout, a request waits for the server indefinitely.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ignores proxies configured through the environment.
    #[inline]
    pub fn without_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> HttpConfig {
        let mut base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        while base_url.ends_with('/') {
            base_url.pop();
        }
        HttpConfig {
            base_url,
            timeout: self.timeout,
            no_proxy: self.no_proxy,
        }
    }
}

/// Configuration for [`crate::HttpBackend`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpConfig {
    pub(crate) base_url: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) no_proxy: bool,
}

impl HttpConfig {
    /// Returns the base URL without trailing slashes.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[inline]
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slashes() {
        let config =
            HttpConfigBuilder::with_base_url("http://chat.local:8080//")
                .build();
        assert_eq!(config.base_url(), "http://chat.local:8080");
        assert_eq!(config.url("/clear"), "http://chat.local:8080/clear");
    }

    #[test]
    fn test_default_base_url() {
        let config = HttpConfigBuilder::default().build();
        assert_eq!(config.url("/"), "http://127.0.0.1:5000/");
        assert_eq!(config.timeout, None);
    }
}
