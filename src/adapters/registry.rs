// src/adapters/registry.rs

use crate::adapters::caixa::CaixaAdapter;
use crate::adapters::mega_leiloes::MegaLeiloesAdapter;
use crate::adapters::resale::ResaleAdapter;
use crate::adapters::sold_leiloes::SoldLeiloesAdapter;
use crate::adapters::zuk::ZukAdapter;
use crate::adapters::{SiteAdapter, SiteOverrides, SiteSessionConfig};
use crate::errors::ExtractionError;
use std::sync::Arc;

/// Ordered set of adapters a run will execute.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SiteAdapter>>,
}

fn configured(mut config: SiteSessionConfig, overrides: &SiteOverrides) -> SiteSessionConfig {
    config.apply_overrides(overrides);
    config
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in auction sites with run-wide overrides applied.
    /// Fails only if a built-in selector does not compile.
    pub fn builtin(overrides: &SiteOverrides) -> Result<Self, ExtractionError> {
        let mut registry = Self::new();
        registry.register(Arc::new(CaixaAdapter::new(configured(
            CaixaAdapter::default_config(),
            overrides,
        ))?));
        registry.register(Arc::new(ZukAdapter::new(configured(
            ZukAdapter::default_config(),
            overrides,
        ))?));
        registry.register(Arc::new(MegaLeiloesAdapter::new(configured(
            MegaLeiloesAdapter::default_config(),
            overrides,
        ))?));
        registry.register(Arc::new(ResaleAdapter::new(configured(
            ResaleAdapter::default_config(),
            overrides,
        ))?));
        registry.register(Arc::new(SoldLeiloesAdapter::new(configured(
            SoldLeiloesAdapter::default_config(),
            overrides,
        ))?));
        Ok(registry)
    }

    /// Adds an adapter, replacing one already registered under the same name.
    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) {
        match self.adapters.iter().position(|a| a.name() == adapter.name()) {
            Some(i) => self.adapters[i] = adapter,
            None => self.adapters.push(adapter),
        }
    }

    /// Keeps only the named adapters. An empty allowlist keeps everything.
    pub fn retain(&mut self, allowlist: &[String]) {
        if allowlist.is_empty() {
            return;
        }
        self.adapters
            .retain(|a| allowlist.iter().any(|name| name.eq_ignore_ascii_case(a.name())));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn adapters(&self) -> &[Arc<dyn SiteAdapter>] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}
