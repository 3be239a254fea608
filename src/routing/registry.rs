//! Backend registry.
//!
//! # Responsibilities
//! - Map ingress tokens to add-on endpoints
//! - Expose panel metadata for the listing endpoint
//! - Accept wholesale replacement on config reload

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::config::AddonConfig;
use crate::routing::Backend;

/// Panel display metadata for one add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub title: String,
    pub icon: Option<String>,
    pub admin: bool,
    pub enable: bool,
}

/// Source of token → backend mappings.
pub trait BackendRegistry: Send + Sync {
    /// Backend routed by `token`, if any.
    fn lookup(&self, token: &str) -> Option<Backend>;

    /// Every known add-on with its panel metadata, keyed by slug.
    fn panels(&self) -> Vec<(String, Panel)>;
}

#[derive(Debug, Default)]
struct AddonTable {
    by_token: HashMap<String, Backend>,
    panels: Vec<(String, Panel)>,
}

impl AddonTable {
    fn from_config(addons: &[AddonConfig]) -> Self {
        let mut table = AddonTable::default();
        for addon in addons {
            table.by_token.insert(
                addon.token.clone(),
                Backend {
                    slug: addon.slug.clone(),
                    address: addon.address.clone(),
                    port: addon.port,
                    stream: addon.stream,
                },
            );
            table.panels.push((
                addon.slug.clone(),
                Panel {
                    title: addon.panel.title.clone(),
                    icon: addon.panel.icon.clone(),
                    admin: addon.panel.admin,
                    enable: addon.panel.enabled,
                },
            ));
        }
        table
    }
}

/// Registry backed by the `[[addons]]` config table, swappable at runtime.
#[derive(Debug)]
pub struct ConfigRegistry {
    table: ArcSwap<AddonTable>,
}

impl ConfigRegistry {
    pub fn new(addons: &[AddonConfig]) -> Self {
        Self {
            table: ArcSwap::from_pointee(AddonTable::from_config(addons)),
        }
    }

    /// Atomically replace the add-on table.
    pub fn replace(&self, addons: &[AddonConfig]) {
        self.table
            .store(Arc::new(AddonTable::from_config(addons)));
        tracing::info!(addons = addons.len(), "Ingress add-on table updated");
    }

    pub fn len(&self) -> usize {
        self.table.load().by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackendRegistry for ConfigRegistry {
    fn lookup(&self, token: &str) -> Option<Backend> {
        self.table.load().by_token.get(token).cloned()
    }

    fn panels(&self) -> Vec<(String, Panel)> {
        self.table.load().panels.clone()
    }
}
