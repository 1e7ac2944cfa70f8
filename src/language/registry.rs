// Language registry: canonical name -> manager, with alias resolution at lookup time

use dashmap::DashMap;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{HookEnvError, LanguageError, Result};
use crate::fingerprint;

use super::traits::Language;

/// Registered language managers keyed by canonical name
pub struct LanguageRegistry {
    plugins: DashMap<String, Arc<dyn Language>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            plugins: DashMap::new(),
        }
    }

    /// Registry holding every built-in manager
    pub fn with_builtin_languages(config: &StoreConfig) -> Self {
        let registry = Self::new();
        registry.load_builtin_plugins(config);
        registry
    }

    /// Register `language` under its canonical name, returning any manager it replaced
    pub fn register_plugin(&self, language: Arc<dyn Language>) -> Option<Arc<dyn Language>> {
        let name = fingerprint::canonical_language(language.name());
        self.plugins.insert(name, language)
    }

    /// Look up a manager by name or alias
    pub fn get_plugin(&self, language_name: &str) -> Option<Arc<dyn Language>> {
        self.plugins
            .get(&fingerprint::canonical_language(language_name))
            .map(|entry| entry.value().clone())
    }

    /// Like `get_plugin`, but an unknown language is an `UnsupportedLanguage` error
    pub fn resolve(&self, language_name: &str) -> Result<Arc<dyn Language>> {
        self.get_plugin(language_name).ok_or_else(|| {
            HookEnvError::Language(Box::new(LanguageError::UnsupportedLanguage {
                language: language_name.to_string(),
                available_languages: self.list_plugins(),
            }))
        })
    }

    /// Canonical names, sorted
    pub fn list_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn load_builtin_plugins(&self, config: &StoreConfig) {
        let builtins: Vec<Arc<dyn Language>> = vec![
            Arc::new(super::python::PythonLanguagePlugin::new()),
            Arc::new(super::nodejs::NodejsLanguagePlugin::new(config.node_package_manager)),
            Arc::new(super::ruby::RubyLanguagePlugin::new()),
            Arc::new(super::rust::RustLanguagePlugin::new()),
            Arc::new(super::golang::GolangLanguagePlugin::new()),
            Arc::new(super::dart::DartLanguagePlugin::new()),
            Arc::new(super::swift::SwiftLanguagePlugin::new()),
            Arc::new(super::lua::LuaLanguagePlugin::new()),
            Arc::new(super::perl::PerlLanguagePlugin::new()),
            Arc::new(super::r::RLanguagePlugin::new()),
            Arc::new(super::haskell::HaskellLanguagePlugin::new()),
            Arc::new(super::julia::JuliaLanguagePlugin::new()),
            Arc::new(super::dotnet::DotnetLanguagePlugin::new()),
            Arc::new(super::coursier::CoursierLanguagePlugin::new()),
            Arc::new(super::docker::DockerLanguagePlugin::new()),
            Arc::new(super::docker::DockerImageLanguagePlugin::new()),
            Arc::new(super::conda::CondaLanguagePlugin::new(config.conda_frontend)),
            Arc::new(super::system::SystemLanguagePlugin::system()),
            Arc::new(super::system::SystemLanguagePlugin::script()),
            Arc::new(super::system::SystemLanguagePlugin::fail()),
            Arc::new(super::system::SystemLanguagePlugin::pygrep()),
        ];
        for language in builtins {
            self.register_plugin(language);
        }
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
