//! Registry of callables reachable through `userFunc = name(args)`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::value::Value;

/// A registered user function.
pub type UserFunction = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Named user functions, populated at start-up.
#[derive(Clone, Default)]
pub struct UserFunctionRegistry {
    functions: HashMap<String, UserFunction>,
}

impl UserFunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `name`, replacing an earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    /// Call `name`; `None` if nothing is registered under it.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        self.functions.get(name).map(|f| f(args))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl fmt::Debug for UserFunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("UserFunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}
