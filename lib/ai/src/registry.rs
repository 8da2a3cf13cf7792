//! Name-keyed registry of provider adapters.
//!
//! The registry is the open end of the system: adding a provider means
//! registering one more [`ProviderAdapter`]. Registering also records the
//! adapter's unwrap rule with the registry's [`Normalizer`].

use crate::config::ProviderSettings;
use crate::normalize::Normalizer;
use crate::provider::{AzureOpenAi, DeepSeek, Gemini, HuggingFace, ProviderAdapter};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Registered adapters, aliases and their unwrap rules.
#[derive(Default)]
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    aliases: HashMap<String, String>,
    normalizer: Normalizer,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in providers from settings.
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new()
            .with_adapter(Arc::new(AzureOpenAi::new(settings.azure.clone())))
            .with_adapter(Arc::new(DeepSeek::new(settings.deepseek.clone())))
            .with_adapter(Arc::new(Gemini::new(settings.gemini.clone())))
            .with_adapter(Arc::new(HuggingFace::new(settings.huggingface.clone())))
            .with_alias("hf", "huggingface")
    }

    /// Registers an adapter, replacing any previous one with the same name
    /// along with its unwrap rule.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let name = adapter.name().to_lowercase();
        match adapter.unwrap_rule() {
            Some(rule) => self.normalizer.register(name.clone(), rule),
            None => self.normalizer.unregister(&name),
        }
        self.adapters.insert(name, adapter);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Adds an alternative name for a registered provider.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases
            .insert(alias.into().to_lowercase(), target.into().to_lowercase());
        self
    }

    /// Looks up an adapter by name or alias, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        let key = name.trim().to_lowercase();
        let key = self.aliases.get(&key).unwrap_or(&key);
        self.adapters.get(key).cloned()
    }

    /// Registered provider names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Normalizer carrying every registered unwrap rule.
    #[must_use]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}
