//! Module loading
//!
//! The registry never knows how a module is fetched. A [`ModuleLoader`] turns
//! a resolved locator into an implementation, possibly asynchronously.

use crate::components::PluginComponent;
use crate::error::LoadError;
use futures::future::{self, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

pub type LoadResult = Result<Arc<dyn PluginComponent>, LoadError>;

pub trait ModuleLoader: Send + Sync {
    fn load(&self, locator: &Url) -> BoxFuture<'static, LoadResult>;
}

/// Loader over modules compiled into the host
#[derive(Default, Clone)]
pub struct StaticModuleLoader {
    modules: HashMap<String, Arc<dyn PluginComponent>>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `component` at `locator` (an absolute URL such as `builtin:name`)
    pub fn with_module(mut self, locator: &str, component: Arc<dyn PluginComponent>) -> Self {
        self.modules.insert(locator.to_string(), component);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load(&self, locator: &Url) -> BoxFuture<'static, LoadResult> {
        let result = self
            .modules
            .get(locator.as_str())
            .cloned()
            .ok_or_else(|| LoadError::NotFound(locator.to_string()));
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::PluginContext;

    struct Noop;

    impl PluginComponent for Noop {
        fn run(&self, _cx: &mut PluginContext<'_>) {}
    }

    #[tokio::test]
    async fn test_static_loader() {
        let loader = StaticModuleLoader::new().with_module("builtin:noop", Arc::new(Noop));

        let found = loader.load(&Url::parse("builtin:noop").unwrap()).await;
        assert!(found.is_ok());

        let missing = loader.load(&Url::parse("builtin:other").unwrap()).await;
        assert!(matches!(missing, Err(LoadError::NotFound(_))));
    }
}
