//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ConditionService, TreeService};
use crate::config::Settings;
use crate::domain::UserFunctionRegistry;
use crate::infrastructure::traits::{
    Clock, FileSystem, HostnameProvider, RealFileSystem, SystemClock, SystemHostname,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub clock: Arc<dyn Clock>,

    pub host: Arc<dyn HostnameProvider>,

    user_functions: UserFunctionRegistry,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(SystemClock),
            Arc::new(SystemHostname),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        host: Arc<dyn HostnameProvider>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            clock,
            host,
            user_functions: UserFunctionRegistry::default(),
        }
    }

    /// Register user functions available to `userFunc` conditions.
    pub fn with_user_functions(mut self, functions: UserFunctionRegistry) -> Self {
        self.user_functions = functions;
        self
    }

    pub fn condition_service(&self) -> ConditionService {
        ConditionService::new(self.settings.clone(), self.clock.clone(), self.host.clone())
            .with_user_functions(self.user_functions.clone())
    }

    pub fn tree_service(&self) -> TreeService {
        TreeService::new(self.fs.clone(), self.settings.clone())
    }
}
