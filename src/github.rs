//! GitHub probe: repository existence and size checks ahead of admission.
//!
//! The reported size feeds the disk-quota admission check, so a task is
//! rejected before anything is fetched. Rate-limit responses are decoded
//! into a dedicated error so clients see a retry hint instead of a 404.

use crate::error::ProbeError;
use octocrab::Octocrab;

pub struct GithubProbe {
    client: Octocrab,
}

impl GithubProbe {
    /// Builds a probe client. A personal token is optional but unlocks a
    /// substantially higher API quota.
    pub fn new(token: Option<String>) -> Result<Self, ProbeError> {
        let mut builder = Octocrab::builder();

        if let Some(token) = token {
            builder = builder.personal_token(token);
        }

        let client = builder
            .build()
            .map_err(|err| ProbeError::Api(err.to_string()))?;

        Ok(Self { client })
    }

    /// Returns the provider-reported repository size in bytes.
    ///
    /// # Errors
    ///
    /// `ProbeError::NotFound` for unknown repositories,
    /// `ProbeError::RateLimited` when the API quota is exhausted.
    pub async fn repo_size_bytes(&self, owner: &str, name: &str) -> Result<u64, ProbeError> {
        let repo = self
            .client
            .repos(owner, name)
            .get()
            .await
            .map_err(decode)?;

        // The API reports kibibytes.
        Ok(repo.size.unwrap_or(0) as u64 * 1024)
    }

    /// Existence check. A rate-limited lookup is treated as existing so
    /// the caller can surface the rate limit instead of a bogus 404.
    pub async fn repo_exists(&self, owner: &str, name: &str) -> bool {
        match self.client.repos(owner, name).get().await {
            Ok(_) => true,
            Err(err) => matches!(decode(err), ProbeError::RateLimited),
        }
    }
}

fn decode(err: octocrab::Error) -> ProbeError {
    match err {
        octocrab::Error::GitHub { source, .. } => {
            let message = source.message;

            if message.to_lowercase().contains("rate limit") {
                ProbeError::RateLimited
            } else if message == "Not Found" {
                ProbeError::NotFound
            } else {
                ProbeError::Api(message)
            }
        }
        other => ProbeError::Api(other.to_string()),
    }
}
