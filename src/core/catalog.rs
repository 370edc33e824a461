/// Template catalog — the immutable, queryable template set and its
/// registration/reload machinery.

use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::core::matcher;
use crate::schema::template::{Template, TemplateError, TemplateRecord};

#[derive(Debug, Error, PartialEq)]
pub enum RegistrationError {
    #[error("duplicate template id '{0}'")]
    DuplicateId(String),
    #[error("trigger '{trigger}' is already registered to template '{existing_id}'")]
    DuplicateTrigger {
        trigger: String,
        existing_id: String,
    },
}

/// Outcome of building a catalog from source records. Templates that fail
/// validation are skipped and reported here; the rest load normally.
#[derive(Debug)]
pub struct LoadReport {
    pub catalog: Catalog,
    pub errors: Vec<LoadError>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// An immutable-after-construction set of templates, indexed by id and by
/// normalized trigger phrase. Concurrent reads need no locking; reloads
/// build a whole new catalog (see [`CatalogHandle`]).
#[derive(Debug, Default)]
pub struct Catalog {
    templates: HashMap<String, Template>,
    trigger_index: FxHashMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template. Fails without touching the catalog if the id or any
    /// trigger (compared under normalization) is already registered.
    pub fn register(&mut self, template: Template) -> Result<(), RegistrationError> {
        if self.templates.contains_key(template.id()) {
            return Err(RegistrationError::DuplicateId(template.id().to_string()));
        }
        let normalized: Vec<String> = template
            .triggers()
            .iter()
            .map(|t| matcher::normalize(t))
            .collect();
        for (trigger, key) in template.triggers().iter().zip(&normalized) {
            if let Some(existing_id) = self.trigger_index.get(key) {
                return Err(RegistrationError::DuplicateTrigger {
                    trigger: trigger.clone(),
                    existing_id: existing_id.clone(),
                });
            }
        }
        for key in normalized {
            self.trigger_index.insert(key, template.id().to_string());
        }
        self.templates
            .insert(template.id().to_string(), template);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Resolve a phrase to a template: exact trigger match first, then
    /// fuzzy token-set similarity. See [`matcher::match_trigger`] for the
    /// scoring and tie-break rules.
    pub fn find_by_trigger(&self, phrase: &str) -> Option<&Template> {
        matcher::match_trigger(phrase, self).map(|hit| hit.template)
    }

    /// Templates whose `category` metadata equals `category`, sorted by id.
    pub fn list_by_category(&self, category: &str) -> Vec<&Template> {
        let mut matches: Vec<&Template> = self
            .templates
            .values()
            .filter(|t| t.category() == Some(category))
            .collect();
        matches.sort_by_key(|t| t.id());
        matches
    }

    /// All templates, in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Exact lookup on an already-normalized trigger phrase.
    pub(crate) fn template_for_trigger(&self, normalized: &str) -> Option<&Template> {
        self.trigger_index
            .get(normalized)
            .and_then(|id| self.templates.get(id))
    }

    /// Build a catalog from deserialized source records. A record that
    /// fails validation or collides with an earlier registration is
    /// skipped and reported; every other template still loads. Records are
    /// processed in id order so duplicate-trigger blame is deterministic.
    pub fn from_records<I>(records: I) -> LoadReport
    where
        I: IntoIterator<Item = (String, TemplateRecord)>,
    {
        let mut sorted: Vec<(String, TemplateRecord)> = records.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut catalog = Catalog::new();
        let mut errors = Vec::new();
        for (id, record) in sorted {
            let template = match Template::from_record(&id, record) {
                Ok(template) => template,
                Err(err) => {
                    log::debug!("skipping template '{}': {}", id, err);
                    errors.push(LoadError::Template(err));
                    continue;
                }
            };
            if let Err(err) = catalog.register(template) {
                log::debug!("skipping template '{}': {}", id, err);
                errors.push(LoadError::Registration(err));
            }
        }
        LoadReport { catalog, errors }
    }

    /// Parse a RON map of template ids to source records and build a
    /// catalog from it. Takes an in-memory string; reading files is the
    /// caller's concern.
    pub fn parse_ron(input: &str) -> Result<LoadReport, ron::error::SpannedError> {
        let records: HashMap<String, TemplateRecord> = ron::from_str(input)?;
        Ok(Self::from_records(records))
    }
}

/// Shared handle over the current catalog snapshot.
///
/// Renders clone the `Arc` and run against a consistent snapshot; a reload
/// swaps the pointer atomically, leaving in-flight renders on the old
/// catalog until they complete. No render ever observes a half-updated
/// catalog.
#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// The current snapshot. Holding the returned `Arc` across a swap is
    /// fine; it stays internally coherent until dropped.
    pub fn load(&self) -> Arc<Catalog> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Atomically replace the catalog. In-flight readers are unaffected.
    pub fn swap(&self, catalog: Catalog) {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(catalog);
    }

    /// Derive a replacement catalog from the current one and install it,
    /// all inside the write lock. Concurrent `update` calls are serialized,
    /// so no mutation is lost to a stale snapshot; readers still only ever
    /// observe complete catalogs.
    pub fn update<F>(&self, build: F)
    where
        F: FnOnce(&Catalog) -> Catalog,
    {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = build(&guard);
        *guard = Arc::new(next);
    }
}
