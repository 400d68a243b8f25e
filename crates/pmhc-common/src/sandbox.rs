use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use crate::error::SetupError;

/// Hosts the installer is allowed to download from unless configuration adds more.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "zenodo.org",                // AFfine data record
    "github.com",                // release assets
    "objects.githubusercontent.com",
    "huggingface.co",            // model weights mirrors
];

const MAX_REDIRECTS: usize = 10;

/// An HTTP client that only issues requests to allowlisted hosts.
/// Every download the installer performs goes through this client, and
/// redirects are re-checked against the same allowlist.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: Arc<HashSet<String>>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, SetupError> {
        Self::with_extra_hosts(timeout, &[])
    }

    /// Default allowlist plus `extra` exact hostnames.
    pub fn with_extra_hosts(timeout: Duration, extra: &[String]) -> Result<Self, SetupError> {
        let allowlist: Arc<HashSet<String>> = Arc::new(
            DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(|d| d.to_string())
                .chain(extra.iter().cloned())
                .collect(),
        );

        let policy_hosts = Arc::clone(&allowlist);
        let redirect = Policy::custom(move |attempt| follow_if_allowed(&policy_hosts, attempt));

        let client = ClientBuilder::new()
            .timeout(timeout)
            .redirect(redirect)
            .user_agent(concat!("pmhc-setup/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, allowlist })
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        Url::parse(url).map(|u| url_allowed(&self.allowlist, &u)).unwrap_or(false)
    }

    /// GET request builder for an allowlisted URL.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, SetupError> {
        if !self.is_allowed(url) {
            return Err(SetupError::Security(format!(
                "download blocked: host not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}

/// https only, exact host or a subdomain of an allowed host.
fn url_allowed(allowlist: &HashSet<String>, url: &Url) -> bool {
    if url.scheme() != "https" {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    allowlist
        .iter()
        .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
}

fn follow_if_allowed(allowlist: &HashSet<String>, attempt: Attempt) -> reqwest::redirect::Action {
    if attempt.previous().len() >= MAX_REDIRECTS {
        attempt.error("too many redirects")
    } else if url_allowed(allowlist, attempt.url()) {
        attempt.follow()
    } else {
        let blocked = format!("redirect blocked: host not in allowlist for URL {}", attempt.url());
        attempt.error(blocked)
    }
}
