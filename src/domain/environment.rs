//! Request-scoped environment read by condition predicates.
//!
//! Everything a predicate needs from the outside world (time, addresses,
//! host name, context) is captured here, so evaluation itself is pure.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::domain::error::DomainError;

/// Root contexts an application context may start with.
pub const ROOT_CONTEXTS: [&str; 3] = ["Production", "Development", "Testing"];

/// Hierarchical runtime context like `Production/Staging/Server2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationContext {
    name: String,
}

impl ApplicationContext {
    pub fn new(name: &str) -> Result<Self, DomainError> {
        let name = name.trim().trim_end_matches('/');
        let root = name.split('/').next().unwrap_or_default();
        if !ROOT_CONTEXTS.contains(&root) {
            return Err(DomainError::InvalidArgument(format!(
                "application context must start with one of {}: {:?}",
                ROOT_CONTEXTS.join(", "),
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self {
            name: "Production".to_string(),
        }
    }
}

impl FromStr for ApplicationContext {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ApplicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Logged-in frontend user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendUser {
    pub id: i64,
    pub groups: Vec<i64>,
}

/// Snapshot of the environment a condition is evaluated in.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    /// Simulated "now"
    pub now: DateTime<FixedOffset>,
    /// Direct peer address (`REMOTE_ADDR`)
    pub remote_addr: String,
    /// `X-Forwarded-For` header, if the request carried one
    pub forwarded_for: Option<String>,
    /// Host name the request is served for
    pub hostname: String,
    pub application_context: ApplicationContext,
    /// `Accept-Language` header
    pub accept_language: String,
    pub user: Option<FrontendUser>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::at(Utc.timestamp_opt(0, 0).single().unwrap_or_default().fixed_offset())
    }
}

impl Environment {
    /// Empty environment at the given point in time.
    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self {
            now,
            remote_addr: String::new(),
            forwarded_for: None,
            hostname: String::new(),
            application_context: ApplicationContext::default(),
            accept_language: String::new(),
            user: None,
        }
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    pub fn with_forwarded_for(mut self, header: impl Into<String>) -> Self {
        self.forwarded_for = Some(header.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_application_context(mut self, context: ApplicationContext) -> Self {
        self.application_context = context;
        self
    }

    pub fn with_accept_language(mut self, header: impl Into<String>) -> Self {
        self.accept_language = header.into();
        self
    }

    pub fn with_user(mut self, user: FrontendUser) -> Self {
        self.user = Some(user);
        self
    }
}
