//! Condition matching service
//!
//! Captures the environment once per evaluation pass and builds a
//! [`ConditionMatcher`] from the settings.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, warn};

use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{
    ApplicationContext, ConditionMatcher, Environment, FrontendUser, UserFunctionRegistry,
};
use crate::infrastructure::traits::{Clock, HostnameProvider};

/// Request data overriding what the service would capture itself.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub remote_addr: Option<String>,
    pub forwarded_for: Option<String>,
    pub hostname: Option<String>,
    pub application_context: Option<String>,
    pub now: Option<DateTime<FixedOffset>>,
    pub accept_language: Option<String>,
    pub user: Option<FrontendUser>,
}

/// Service for evaluating conditions.
pub struct ConditionService {
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    host: Arc<dyn HostnameProvider>,
    functions: UserFunctionRegistry,
}

impl ConditionService {
    /// Create a new condition service.
    pub fn new(
        settings: Arc<Settings>,
        clock: Arc<dyn Clock>,
        host: Arc<dyn HostnameProvider>,
    ) -> Self {
        Self {
            settings,
            clock,
            host,
            functions: UserFunctionRegistry::default(),
        }
    }

    pub fn with_user_functions(mut self, functions: UserFunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Capture the environment: explicit options first, then clock, host
    /// name and settings.
    pub fn environment(&self, options: RequestOptions) -> ApplicationResult<Environment> {
        let now = options.now.unwrap_or_else(|| self.clock.now());
        let hostname = match options.hostname {
            Some(h) => h,
            None => self.host.hostname().unwrap_or_else(|e| {
                warn!("cannot determine host name: {}", e);
                String::new()
            }),
        };
        let context = match options.application_context {
            Some(c) => ApplicationContext::new(&c)?,
            None => self.settings.application_context()?,
        };

        let mut env = Environment::at(now)
            .with_hostname(hostname)
            .with_application_context(context)
            .with_remote_addr(options.remote_addr.unwrap_or_default())
            .with_accept_language(options.accept_language.unwrap_or_default());
        if let Some(header) = options.forwarded_for {
            env = env.with_forwarded_for(header);
        }
        if let Some(user) = options.user {
            env = env.with_user(user);
        }
        debug!("environment: {:?}", env);
        Ok(env)
    }

    /// Matcher for the given environment.
    pub fn matcher(&self, environment: Environment) -> ApplicationResult<ConditionMatcher> {
        Ok(ConditionMatcher::new(environment, self.settings.matcher_config()?)
            .with_user_functions(self.functions.clone()))
    }

    /// Match `expression` in the environment described by `options`.
    pub fn match_condition(&self, expression: &str, options: RequestOptions) -> ApplicationResult<bool> {
        let matcher = self.matcher(self.environment(options)?)?;
        Ok(matcher.match_condition(expression))
    }
}
