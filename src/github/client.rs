//! Octocrab client wrapper.
//!
//! `OctocrabClient` owns a token-authenticated `Octocrab` instance. Unlike
//! most GitHub tooling it is not scoped to a repository: each publish target
//! names its own repository.

use octocrab::Octocrab;

/// A token-authenticated GitHub API client.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
}

impl OctocrabClient {
    /// Wraps a pre-configured Octocrab instance.
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates a client from a personal access token.
    ///
    /// `base_uri` overrides the API root, for GitHub Enterprise
    /// (`https://ghe.example.com/api/v3`) or a local test server.
    pub fn from_token(
        token: impl Into<String>,
        base_uri: Option<&str>,
    ) -> Result<Self, octocrab::Error> {
        let mut builder = Octocrab::builder().personal_token(token.into());
        if let Some(base_uri) = base_uri {
            builder = builder.base_uri(base_uri)?;
        }
        Ok(Self::new(builder.build()?))
    }

    /// Returns a reference to the underlying octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.client
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient").finish_non_exhaustive()
    }
}
