//! Runtime configuration.
//!
//! Flags are parsed with clap; each has an environment variable that, when
//! set to a non-empty value, takes precedence over the flag. `Config::resolve`
//! turns both into one validated struct, built once at startup and passed
//! down explicitly. Nothing else in the crate reads the environment.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::dispatch::{DispatchTable, UnrecognizedPolicy};
use crate::stream::DEFAULT_REDIS_ADDR;
use crate::types::{Committer, PublishSettings, RepoId};

pub const ENV_OWNER: &str = "GITHUB_OWNER";
pub const ENV_REPO: &str = "GITHUB_REPOSITORY";
pub const ENV_BRANCH: &str = "GITHUB_BRANCH";
pub const ENV_PATH: &str = "GITHUB_PATH";
pub const ENV_USER: &str = "GITHUB_USER";
pub const ENV_EMAIL: &str = "GITHUB_EMAIL";
pub const ENV_TOKEN: &str = "GITHUB_ACCESS_TOKEN";
pub const ENV_API_URL: &str = "GITHUB_API_URL";
pub const ENV_REDIS_ADDR: &str = "REDIS_ADDR";
pub const ENV_ACK_UNRECOGNIZED: &str = "ACK_UNRECOGNIZED";
pub const ENV_RECLAIM_IDLE_SECS: &str = "RECLAIM_IDLE_SECS";
pub const ENV_HEALTH_ADDR: &str = "HEALTH_ADDR";

/// Publishes generated dashboards from a Redis stream to a GitHub repository.
#[derive(Parser, Debug, Default)]
#[command(name = "dashboard-bridge")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Repository owner [env: GITHUB_OWNER]
    #[arg(long, value_name = "OWNER")]
    pub github_owner: Option<String>,

    /// Repository name [env: GITHUB_REPOSITORY]
    #[arg(long, value_name = "REPO")]
    pub github_repo: Option<String>,

    /// Target branch; the default branch when unset [env: GITHUB_BRANCH]
    #[arg(long, value_name = "BRANCH")]
    pub github_branch: Option<String>,

    /// Directory in the repository to create files under [env: GITHUB_PATH]
    #[arg(long, value_name = "DIR")]
    pub github_path: Option<String>,

    /// Committer name [env: GITHUB_USER]
    #[arg(long, value_name = "NAME")]
    pub github_user: Option<String>,

    /// Committer email [env: GITHUB_EMAIL]
    #[arg(long, value_name = "EMAIL")]
    pub github_email: Option<String>,

    /// Personal access token with contents write access [env: GITHUB_ACCESS_TOKEN]
    #[arg(long, value_name = "TOKEN")]
    pub github_pat: Option<String>,

    /// API root, for GitHub Enterprise [env: GITHUB_API_URL]
    #[arg(long, value_name = "URL")]
    pub github_api_url: Option<String>,

    /// Redis address, host:port or redis:// URL [env: REDIS_ADDR]
    #[arg(long, value_name = "ADDR")]
    pub redis_addr: Option<String>,

    /// Acknowledge entries of unrecognized kinds instead of leaving them pending [env: ACK_UNRECOGNIZED]
    #[arg(long)]
    pub ack_unrecognized: bool,

    /// Reclaim entries pending longer than this many seconds at startup [env: RECLAIM_IDLE_SECS]
    #[arg(long, value_name = "SECS")]
    pub reclaim_idle_secs: Option<String>,

    /// Serve /health and /api/v1/status on this address [env: HEALTH_ADDR]
    #[arg(long, value_name = "ADDR")]
    pub health_addr: Option<String>,
}

/// A configuration problem, reported before anything connects.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting --{flag} (or {env})")]
    Missing {
        flag: &'static str,
        env: &'static str,
    },

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Validated runtime configuration.
#[derive(Clone)]
pub struct Config {
    pub repo: RepoId,
    pub branch: Option<String>,
    pub directory: String,
    pub committer: Option<Committer>,
    pub token: String,
    pub api_url: Option<String>,
    pub redis_addr: String,
    pub unrecognized: UnrecognizedPolicy,
    /// Reclamation threshold; `None` disables reclamation.
    pub reclaim_idle: Option<Duration>,
    pub health_addr: Option<SocketAddr>,
}

impl Config {
    /// Merges flags with the environment and validates the result.
    ///
    /// `env` looks up a variable; the binary passes `std::env::var`, tests
    /// pass a map.
    pub fn resolve(
        args: Args,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Config, ConfigError> {
        let pick = |flag: Option<String>, name: &str| -> Option<String> {
            env(name)
                .filter(|v| !v.is_empty())
                .or(flag)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |flag: Option<String>, flag_name: &'static str, env_name: &'static str| {
            pick(flag, env_name).ok_or(ConfigError::Missing {
                flag: flag_name,
                env: env_name,
            })
        };

        let owner = required(args.github_owner, "github-owner", ENV_OWNER)?;
        let repo = required(args.github_repo, "github-repo", ENV_REPO)?;
        let token = required(args.github_pat, "github-pat", ENV_TOKEN)?;

        let branch = pick(args.github_branch, ENV_BRANCH);
        let directory = pick(args.github_path, ENV_PATH).unwrap_or_default();
        let committer = Committer::from_parts(
            pick(args.github_user, ENV_USER).unwrap_or_default(),
            pick(args.github_email, ENV_EMAIL).unwrap_or_default(),
        );
        let api_url = pick(args.github_api_url, ENV_API_URL);
        let redis_addr =
            pick(args.redis_addr, ENV_REDIS_ADDR).unwrap_or_else(|| DEFAULT_REDIS_ADDR.to_string());

        let ack_unrecognized = match env(ENV_ACK_UNRECOGNIZED).filter(|v| !v.is_empty()) {
            Some(value) => parse_bool(ENV_ACK_UNRECOGNIZED, &value)?,
            None => args.ack_unrecognized,
        };
        let unrecognized = if ack_unrecognized {
            UnrecognizedPolicy::Acknowledge
        } else {
            UnrecognizedPolicy::LeavePending
        };

        let reclaim_idle = pick(args.reclaim_idle_secs, ENV_RECLAIM_IDLE_SECS)
            .map(|value| parse_idle_secs(&value))
            .transpose()?;

        let health_addr = pick(args.health_addr, ENV_HEALTH_ADDR)
            .map(|value| {
                value.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                    name: ENV_HEALTH_ADDR,
                    value: value.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        if let Some(url) = &api_url
            && let Err(e) = url::Url::parse(url)
        {
            return Err(ConfigError::Invalid {
                name: ENV_API_URL,
                value: url.clone(),
                reason: e.to_string(),
            });
        }

        Ok(Config {
            repo: RepoId::new(owner, repo),
            branch,
            directory,
            committer,
            token,
            api_url,
            redis_addr,
            unrecognized,
            reclaim_idle,
            health_addr,
        })
    }

    /// The static part of every publish.
    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            directory: self.directory.clone(),
            committer: self.committer.clone(),
        }
    }

    pub fn dispatch_table(&self) -> DispatchTable {
        DispatchTable::dashboards(self.unrecognized)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("directory", &self.directory)
            .field("committer", &self.committer)
            .field("token", &"[redacted]")
            .field("api_url", &self.api_url)
            .field("redis_addr", &self.redis_addr)
            .field("unrecognized", &self.unrecognized)
            .field("reclaim_idle", &self.reclaim_idle)
            .field("health_addr", &self.health_addr)
            .finish()
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn parse_idle_secs(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        name: ENV_RECLAIM_IDLE_SECS,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let secs: u64 = value
        .parse()
        .map_err(|_| invalid("expected a whole number of seconds"))?;
    if secs == 0 {
        // Zero would claim entries another live consumer is still working on.
        return Err(invalid("must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}
