//! Condition matching: `[hostname = localhost] && [date("G") >= 8]`.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use tracing::{debug, instrument, warn};

use crate::domain::arguments::parse_arguments;
use crate::domain::date::php_date;
use crate::domain::environment::Environment;
use crate::domain::error::DomainError;
use crate::domain::expression::{evaluate, parse_expression, ExpressionContext};
use crate::domain::matching::{
    cmp_fqdn, cmp_ip, compare_number, language_matches, search_string_wildcard, trim_explode,
};
use crate::domain::normalizer::{normalize_expression, split_condition};
use crate::domain::predicate::Predicate;
use crate::domain::user_function::UserFunctionRegistry;
use crate::domain::value::Value;

/// Placeholder in IP lists replaced by the development IP mask.
pub const DEV_IP: &str = "devIP";

/// Which entry of a multi-valued `X-Forwarded-For` header to trust.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForwardedForPolicy {
    /// Keep the proxy's address
    #[default]
    None,
    First,
    Last,
}

impl FromStr for ForwardedForPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(DomainError::InvalidArgument(format!(
                "forwarded-for policy must be none, first or last: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for ForwardedForPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::First => "first",
            Self::Last => "last",
        })
    }
}

/// Static configuration of a [`ConditionMatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Feature flags by name; unknown flags are disabled
    pub features: HashMap<String, bool>,
    /// Comma separated IP list substituted for `devIP`
    pub dev_ip_mask: String,
    /// Addresses of trusted reverse proxies (`*` trusts every peer)
    pub reverse_proxy_ips: Vec<String>,
    pub forwarded_for: ForwardedForPolicy,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            features: HashMap::new(),
            dev_ip_mask: "127.0.0.1,::1".to_string(),
            reverse_proxy_ips: Vec::new(),
            forwarded_for: ForwardedForPolicy::None,
        }
    }
}

/// Evaluates condition expressions against a captured [`Environment`].
#[derive(Debug, Clone)]
pub struct ConditionMatcher {
    environment: Environment,
    config: MatcherConfig,
    functions: UserFunctionRegistry,
}

impl ConditionMatcher {
    pub fn new(environment: Environment, config: MatcherConfig) -> Self {
        Self {
            environment,
            config,
            functions: UserFunctionRegistry::default(),
        }
    }

    pub fn with_user_functions(mut self, functions: UserFunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match a complete condition like `[a = 1] AND [b = 2] || [c = 3]`.
    ///
    /// `&&` binds tighter than `||`; evaluation short-circuits. Anything that
    /// is not a sequence of bracket atoms does not match.
    #[instrument(level = "debug", skip(self))]
    pub fn match_condition(&self, expression: &str) -> bool {
        let normalized = normalize_expression(expression);
        let Some(groups) = split_condition(&normalized) else {
            debug!("not a condition: {:?}", normalized);
            return false;
        };
        let result = groups
            .iter()
            .any(|group| group.iter().all(|atom| self.evaluate_condition(atom)));
        debug!("{:?} => {}", normalized, result);
        result
    }

    /// Evaluate a single atom body (without brackets).
    pub fn evaluate_condition(&self, body: &str) -> bool {
        if let Some((name, value)) = split_legacy(body) {
            return self.evaluate_condition_common(Predicate::from_name(name), value);
        }
        match self.evaluate_expression(body) {
            Ok(result) => result,
            Err(e) => {
                warn!("condition [{}] evaluates to false: {}", body, e);
                false
            }
        }
    }

    /// Evaluate a legacy `predicate = value` atom.
    pub fn evaluate_condition_common(&self, predicate: Predicate, value: &str) -> bool {
        let env = &self.environment;
        if let Some(format) = predicate.date_format() {
            let current = php_date(format, &env.now).parse::<f64>().unwrap_or(0.0);
            return compare_number(value, current);
        }

        match predicate {
            Predicate::Hostname => cmp_fqdn(&env.hostname, value),
            Predicate::Ip => cmp_ip(&self.remote_address(), &self.expand_dev_ip(value)),
            Predicate::ApplicationContext => {
                let current = env.application_context.as_str();
                trim_explode(value).any(|pattern| search_string_wildcard(current, pattern))
            }
            Predicate::UserGroup => match &env.user {
                Some(user) if value.trim() == "*" => !user.groups.is_empty(),
                Some(user) => trim_explode(value)
                    .filter_map(|id| id.parse::<i64>().ok())
                    .any(|id| user.groups.contains(&id)),
                None => false,
            },
            Predicate::LoginUser => match &env.user {
                Some(user) => trim_explode(value)
                    .any(|id| id == "*" || id.parse::<i64>().map_or(false, |id| id == user.id)),
                None => value.trim().is_empty(),
            },
            Predicate::Language => language_matches(&env.accept_language, value),
            Predicate::Feature => self.feature(value.trim()),
            Predicate::UserFunc => self.call_user_function(value),
            Predicate::Unknown => {
                debug!("unknown predicate with value {:?}", value);
                false
            }
            // date family handled above
            _ => false,
        }
    }

    /// Parse and evaluate an expression atom; the result must be boolean.
    pub fn evaluate_expression(&self, expression: &str) -> Result<bool, DomainError> {
        let expr = parse_expression(expression)?;
        match evaluate(&expr, self)? {
            Value::Bool(b) => Ok(b),
            other => Err(DomainError::InvalidExpression {
                expression: expression.to_string(),
                message: format!("expected a boolean result, got {}", other.type_name()),
            }),
        }
    }

    /// Client address, taken from `X-Forwarded-For` when the peer is a
    /// trusted reverse proxy.
    pub fn remote_address(&self) -> String {
        let remote = self.environment.remote_addr.trim();
        let trusted = self
            .config
            .reverse_proxy_ips
            .iter()
            .any(|ip| ip.trim() == "*" || ip.trim() == remote);
        if !trusted {
            return remote.to_string();
        }
        let Some(header) = self.environment.forwarded_for.as_deref() else {
            return remote.to_string();
        };

        let forwarded = match self.config.forwarded_for {
            ForwardedForPolicy::None => None,
            ForwardedForPolicy::First => trim_explode(header).next(),
            ForwardedForPolicy::Last => trim_explode(header).last(),
        };
        match forwarded {
            Some(ip) if ip.parse::<IpAddr>().is_ok() => ip.to_string(),
            _ => remote.to_string(),
        }
    }

    pub fn feature(&self, name: &str) -> bool {
        self.config.features.get(name).copied().unwrap_or(false)
    }

    fn expand_dev_ip(&self, list: &str) -> String {
        list.split(',')
            .map(|entry| {
                if entry.trim() == DEV_IP {
                    self.config.dev_ip_mask.as_str()
                } else {
                    entry
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn call_user_function(&self, value: &str) -> bool {
        let call = parse_arguments(value);
        match self.functions.call(&call.name, &call.arguments) {
            Some(result) => {
                debug!("{} returned {}", call, result);
                result.is_truthy()
            }
            None => {
                debug!("user function {:?} is not registered", call.name);
                false
            }
        }
    }
}

impl ExpressionContext for ConditionMatcher {
    fn variable(&self, name: &str) -> Option<Value> {
        match name {
            "applicationContext" => Some(Value::from(
                self.environment.application_context.as_str(),
            )),
            "hostname" => Some(Value::from(self.environment.hostname.as_str())),
            _ => None,
        }
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, DomainError> {
        let arg = |i: usize| -> Result<String, DomainError> {
            args.get(i).map(Value::to_plain_string).ok_or_else(|| {
                DomainError::InvalidExpression {
                    expression: name.to_string(),
                    message: format!("{}() expects {} argument(s)", name, i + 1),
                }
            })
        };

        match name {
            "date" => Ok(Value::String(php_date(&arg(0)?, &self.environment.now))),
            "feature" => Ok(Value::Bool(self.feature(&arg(0)?))),
            "ip" => Ok(Value::Bool(cmp_ip(
                &self.remote_address(),
                &self.expand_dev_ip(&arg(0)?),
            ))),
            "like" => Ok(Value::Bool(search_string_wildcard(&arg(0)?, &arg(1)?))),
            _ => Err(DomainError::InvalidExpression {
                expression: name.to_string(),
                message: format!("unknown function {:?}", name),
            }),
        }
    }
}

/// Split `name = value` atoms; `==` and non-identifier names are expressions.
fn split_legacy(body: &str) -> Option<(&str, &str)> {
    let (name, value) = body.split_once('=')?;
    let name = name.trim();
    let is_identifier = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_identifier || value.starts_with('=') {
        return None;
    }
    Some((name, value.trim()))
}
