use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::cache::ConceptMapCache;
use super::registry::{CompiledMap, ManifestEntry, MappingDocument, RegistryEntry, SourceKey};
use crate::core::config::ConceptMapConfig;
use crate::error::{InteropError, Result};
use crate::storage::ObjectStore;
use crate::transform::systems::tenant_agnostic_system;
use crate::types::{CodeableConcept, Coding, DynamicValue, Extension};

/// A translated coding plus the extension recording what the tenant sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptMapping {
    pub coding: Coding,
    pub extension: Extension,
}

/// A translated concept plus the extension carrying the original concept.
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptTranslation {
    pub concept: CodeableConcept,
    pub extension: Extension,
}

/// Translates tenant source codings into canonical codings using the mapping
/// documents listed in the registry manifest.
///
/// Store outages never surface as errors: a manifest or document that cannot
/// be fetched or parsed is logged and treated as empty.
pub struct ConceptMapClient {
    store: Arc<dyn ObjectStore>,
    cache: Arc<ConceptMapCache>,
    config: ConceptMapConfig,
}

impl ConceptMapClient {
    pub fn new(store: Arc<dyn ObjectStore>, config: ConceptMapConfig) -> Self {
        let cache = Arc::new(ConceptMapCache::new(&config));
        Self::with_cache(store, cache, config)
    }

    /// Build a client around an existing cache, e.g. one shared by several
    /// clients.
    pub fn with_cache(
        store: Arc<dyn ObjectStore>,
        cache: Arc<ConceptMapCache>,
        config: ConceptMapConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<ConceptMapCache> {
        &self.cache
    }

    pub fn config(&self) -> &ConceptMapConfig {
        &self.config
    }

    pub async fn get_concept_mapping(
        &self,
        tenant: &str,
        resource_type: &str,
        element: &str,
        coding: &Coding,
    ) -> Option<ConceptMapping> {
        self.get_concept_mapping_with_refresh(tenant, resource_type, element, coding, None)
            .await
    }

    /// Like [`get_concept_mapping`](Self::get_concept_mapping), reloading the
    /// registry first when the tenant's last reload predates `force_after`.
    pub async fn get_concept_mapping_with_refresh(
        &self,
        tenant: &str,
        resource_type: &str,
        element: &str,
        coding: &Coding,
        force_after: Option<DateTime<Utc>>,
    ) -> Option<ConceptMapping> {
        let (Some(code), Some(system)) = (coding.code.as_deref(), coding.system.as_deref()) else {
            return None;
        };
        let key = SourceKey::new(code, tenant_agnostic_system(system, tenant));

        self.ensure_fresh(tenant, force_after).await;

        let registry = self.cache.registry().await;
        let Some(entry) = registry
            .iter()
            .find(|entry| entry.matches(tenant, resource_type, element))
        else {
            tracing::debug!(tenant, resource_type, element, "no concept map registered");
            return None;
        };

        let Some(target) = entry.compiled.as_ref().and_then(|map| map.get(&key)) else {
            tracing::debug!(
                tenant,
                element,
                code = %key.code,
                system = %key.system,
                map = %entry.display_name(),
                "no concept map target"
            );
            return None;
        };

        Some(ConceptMapping {
            coding: target.to_coding(),
            extension: Extension::new(
                entry.source_extension_url.clone(),
                DynamicValue::Coding(coding.clone()),
            ),
        })
    }

    /// Translate a concept by trying its codings in order; the first coding
    /// with a target wins. The concept text is kept.
    pub async fn get_concept_mapping_for_concept(
        &self,
        tenant: &str,
        resource_type: &str,
        element: &str,
        concept: &CodeableConcept,
        force_after: Option<DateTime<Utc>>,
    ) -> Option<ConceptTranslation> {
        for coding in &concept.coding {
            let Some(mapping) = self
                .get_concept_mapping_with_refresh(tenant, resource_type, element, coding, force_after)
                .await
            else {
                continue;
            };
            return Some(ConceptTranslation {
                concept: CodeableConcept {
                    coding: vec![mapping.coding],
                    text: concept.text.clone(),
                },
                extension: Extension::new(
                    mapping.extension.url,
                    DynamicValue::CodeableConcept(concept.clone()),
                ),
            });
        }
        None
    }

    /// Reload for `tenant` if its view of the registry is stale. Concurrent
    /// callers wait for a reload already in flight instead of starting their
    /// own.
    pub async fn ensure_fresh(&self, tenant: &str, force_after: Option<DateTime<Utc>>) {
        if !self.cache.reload_needed(tenant, force_after) {
            return;
        }
        let _guard = self.cache.reload_lock().await;
        if !self.cache.reload_needed(tenant, force_after) {
            return;
        }
        self.reload_locked(tenant).await;
    }

    /// Unconditionally reload the registry for `tenant`.
    pub async fn reload(&self, tenant: &str) {
        let _guard = self.cache.reload_lock().await;
        self.reload_locked(tenant).await;
    }

    async fn reload_locked(&self, tenant: &str) {
        let manifest = self.load_manifest().await;
        let previous = self.cache.registry().await;
        let previous_by_uuid: HashMap<&str, &RegistryEntry> = previous
            .iter()
            .map(|entry| (entry.uuid.as_str(), entry))
            .collect();

        let mut entries = Vec::with_capacity(manifest.len());
        let mut compiled = 0usize;
        for manifest_entry in manifest {
            let mut entry = RegistryEntry::from_manifest(manifest_entry);
            if let Some(prior) = previous_by_uuid.get(entry.uuid.as_str()) {
                entry = entry.with_prior(prior);
            }
            // entries owned by other tenants keep whatever they were built
            // from; they recompile on their owner's next reload
            if entry.is_relevant_to(tenant) && entry.is_stale() {
                compiled += 1;
                let map = self.compile(&entry).await;
                entry = entry.with_compiled(map);
            }
            entries.push(entry);
        }

        let dropped = previous
            .iter()
            .filter(|old| !entries.iter().any(|entry| entry.uuid == old.uuid))
            .count();

        tracing::info!(
            tenant,
            entries = entries.len(),
            compiled,
            dropped,
            "reloaded concept map registry"
        );

        self.cache.replace_registry(entries).await;
        self.cache.set_last_reload(tenant, Utc::now());
    }

    async fn load_manifest(&self) -> Vec<ManifestEntry> {
        let name = &self.config.manifest_name;
        let contents = match self.fetch_object(name).await {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                tracing::warn!(object = %name, store = %self.store.describe(), "concept map manifest not found");
                return Vec::new();
            }
            Err(e) => {
                tracing::error!(object = %name, error = %e, "failed to fetch concept map manifest");
                return Vec::new();
            }
        };

        ManifestEntry::parse_manifest(&contents).unwrap_or_else(|e| {
            tracing::error!(object = %name, error = %e, "failed to parse concept map manifest");
            Vec::new()
        })
    }

    async fn compile(&self, entry: &RegistryEntry) -> CompiledMap {
        let document = self.load_document(&entry.source_file).await;
        let map = CompiledMap::compile(&document, entry.tenant_id.as_deref());
        tracing::debug!(
            registry_uuid = %entry.uuid,
            element = %entry.data_element,
            version = %entry.version,
            targets = map.len(),
            "compiled concept map"
        );
        map
    }

    async fn load_document(&self, name: &str) -> MappingDocument {
        let contents = match self.fetch_object(name).await {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                tracing::warn!(object = name, "mapping document not found");
                return MappingDocument::default();
            }
            Err(e) => {
                tracing::error!(object = name, error = %e, "failed to fetch mapping document");
                return MappingDocument::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::error!(object = name, error = %e, "failed to parse mapping document");
            MappingDocument::default()
        })
    }

    async fn fetch_object(&self, name: &str) -> Result<Option<String>> {
        let timeout = self.config.fetch_timeout;
        tokio::time::timeout(timeout, self.store.get_object(name))
            .await
            .map_err(|_| {
                InteropError::timeout(format!("fetching '{name}' took longer than {timeout:?}"))
            })?
    }
}

impl std::fmt::Debug for ConceptMapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConceptMapClient")
            .field("store", &self.store.describe())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
