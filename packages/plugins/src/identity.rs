//! Locator resolution and identity tags
//!
//! Every module is bound under a tag derived from its resolved locator, so
//! two descriptors pointing at the same module share one binding.

use crate::error::LoadError;
use crc32fast::Hasher;
use std::collections::HashMap;
use url::Url;

pub const TAG_PREFIX: &str = "quire-plugin";

/// Tag for a resolved module locator
pub fn plugin_tag(locator: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(locator.as_bytes());
    format!("{}-{:x}", TAG_PREFIX, hasher.finalize())
}

/// Resolve `src` against `base` when it is relative
pub fn resolve_locator(base: Option<&Url>, src: &str) -> Result<Url, LoadError> {
    match Url::parse(src) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| LoadError::InvalidLocator {
                locator: src.to_string(),
                reason: "relative locator without a base URL".to_string(),
            })?;
            base.join(src).map_err(|e| LoadError::InvalidLocator {
                locator: src.to_string(),
                reason: e.to_string(),
            })
        }
        Err(e) => Err(LoadError::InvalidLocator {
            locator: src.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Memoized locator → tag lookups
#[derive(Debug, Default, Clone)]
pub struct TagCache {
    tags: HashMap<String, String>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&mut self, locator: &Url) -> String {
        self.tags
            .entry(locator.as_str().to_string())
            .or_insert_with(|| plugin_tag(locator.as_str()))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
