/// The engine facade: template/trigger resolution → rendering → formatting.
///
/// Wires together the catalog, trigger matcher, renderer, and format
/// converter behind the public response API.

use std::sync::Arc;
use thiserror::Error;

use crate::core::catalog::{Catalog, CatalogHandle, RegistrationError};
use crate::core::format::{self, OutputFormat};
use crate::core::matcher;
use crate::core::renderer;
use crate::schema::template::{Template, Verbosity};
use crate::schema::value::Context;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("no template with id '{0}'")]
    TemplateNotFound(String),
    #[error("no trigger match for phrase '{0}'")]
    NoTriggerMatch(String),
}

/// The top-level response engine. Holds the current catalog snapshot behind
/// an atomically swappable handle; render calls are pure reads and may run
/// concurrently, and [`ResponseEngine::reload`] never disturbs a render
/// already in flight.
pub struct ResponseEngine {
    catalog: CatalogHandle,
}

impl ResponseEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: CatalogHandle::new(catalog),
        }
    }

    /// Render a template by id. `verbosity: None` uses the template's
    /// default level. Missing context data never fails the render; it shows
    /// up inline as `{{MISSING: name}}` markers.
    pub fn format_from_template(
        &self,
        template_id: &str,
        context: &Context,
        verbosity: Option<Verbosity>,
    ) -> Result<String, EngineError> {
        let catalog = self.catalog.load();
        let template = catalog
            .get(template_id)
            .ok_or_else(|| EngineError::TemplateNotFound(template_id.to_string()))?;
        Ok(self.render_template(template, context, verbosity))
    }

    /// Like [`format_from_template`](Self::format_from_template), then
    /// converts the rendered text to the requested output format.
    pub fn format_from_template_as(
        &self,
        template_id: &str,
        context: &Context,
        verbosity: Option<Verbosity>,
        output: OutputFormat,
    ) -> Result<String, EngineError> {
        self.format_from_template(template_id, context, verbosity)
            .map(|text| format::convert(&text, output))
    }

    /// Resolve a phrase through the trigger matcher and render the matched
    /// template. Exact trigger hits win over fuzzy similarity.
    pub fn format_from_trigger(
        &self,
        phrase: &str,
        context: &Context,
        verbosity: Option<Verbosity>,
    ) -> Result<String, EngineError> {
        let catalog = self.catalog.load();
        let hit = matcher::match_trigger(phrase, &catalog)
            .ok_or_else(|| EngineError::NoTriggerMatch(phrase.to_string()))?;
        Ok(self.render_template(hit.template, context, verbosity))
    }

    /// Like [`format_from_trigger`](Self::format_from_trigger), then
    /// converts the rendered text to the requested output format.
    pub fn format_from_trigger_as(
        &self,
        phrase: &str,
        context: &Context,
        verbosity: Option<Verbosity>,
        output: OutputFormat,
    ) -> Result<String, EngineError> {
        self.format_from_trigger(phrase, context, verbosity)
            .map(|text| format::convert(&text, output))
    }

    /// Register additional templates at runtime. Each template is
    /// registered independently; failures are collected and returned
    /// together, and a failed template never corrupts the catalog. The
    /// rebuild runs inside the handle's write lock, so concurrent
    /// registrations are serialized and none is lost.
    pub fn register_templates(
        &self,
        templates: Vec<Template>,
    ) -> Result<(), Vec<RegistrationError>> {
        let mut errors = Vec::new();
        self.catalog.update(|current| {
            let mut next = Catalog::new();
            for template in current.iter() {
                // Re-registering a catalog's own templates cannot collide.
                next.register(template.clone())
                    .unwrap_or_else(|_| unreachable!("existing catalog is internally consistent"));
            }
            for template in templates {
                if let Err(err) = next.register(template) {
                    errors.push(err);
                }
            }
            next
        });

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Templates available in the current snapshot, optionally filtered by
    /// `category` metadata, sorted by id.
    pub fn list_available(&self, category: Option<&str>) -> Vec<Template> {
        let catalog = self.catalog.load();
        match category {
            Some(cat) => catalog
                .list_by_category(cat)
                .into_iter()
                .cloned()
                .collect(),
            None => {
                let mut all: Vec<Template> = catalog.iter().cloned().collect();
                all.sort_by(|a, b| a.id().cmp(b.id()));
                all
            }
        }
    }

    /// Replace the whole catalog. In-flight renders finish against the old
    /// snapshot; subsequent calls see the new one.
    pub fn reload(&self, catalog: Catalog) {
        self.catalog.swap(catalog);
    }

    /// The current catalog snapshot, for direct queries.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.load()
    }

    fn render_template(
        &self,
        template: &Template,
        context: &Context,
        verbosity: Option<Verbosity>,
    ) -> String {
        if template.context_required() && context.is_empty() {
            log::warn!(
                "template '{}' expects context data but none was supplied",
                template.id()
            );
        }
        let level = verbosity.unwrap_or_else(|| template.default_verbosity());
        renderer::render(template.ast(), context, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::template::TemplateRecord;
    use crate::schema::value::Value;
    use std::collections::HashMap;

    fn make_template(id: &str, triggers: &[&str], content: &str) -> Template {
        Template::from_record(
            id,
            TemplateRecord {
                triggers: triggers.iter().map(|t| t.to_string()).collect(),
                response_type: "narrative".to_string(),
                context_needed: false,
                verbosity: "concise".to_string(),
                metadata: HashMap::new(),
                content: content.to_string(),
            },
        )
        .unwrap()
    }

    fn build_test_engine() -> ResponseEngine {
        let mut catalog = Catalog::new();
        catalog
            .register(make_template(
                "greeting",
                &["say hello"],
                "Hello {{name}}[detailed], welcome to {{place}}[/detailed]",
            ))
            .unwrap();
        catalog
            .register(make_template(
                "status",
                &["show system status"],
                "Status: {{state}}",
            ))
            .unwrap();
        ResponseEngine::new(catalog)
    }

    fn ctx(pairs: &[(&str, &str)]) -> Context {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn format_from_template_uses_default_verbosity() {
        let engine = build_test_engine();
        let out = engine
            .format_from_template("greeting", &ctx(&[("name", "CORTEX")]), None)
            .unwrap();
        assert_eq!(out, "Hello CORTEX");
    }

    #[test]
    fn format_from_template_verbosity_override() {
        let engine = build_test_engine();
        let out = engine
            .format_from_template(
                "greeting",
                &ctx(&[("name", "CORTEX"), ("place", "ops")]),
                Some(Verbosity::Detailed),
            )
            .unwrap();
        assert_eq!(out, "Hello CORTEX, welcome to ops");
    }

    #[test]
    fn format_from_template_not_found() {
        let engine = build_test_engine();
        let err = engine
            .format_from_template("missing", &Context::new(), None)
            .unwrap_err();
        assert_eq!(err, EngineError::TemplateNotFound("missing".to_string()));
    }

    #[test]
    fn format_from_trigger_exact_and_fuzzy() {
        let engine = build_test_engine();
        let context = ctx(&[("state", "nominal")]);
        let exact = engine
            .format_from_trigger("show system status", &context, None)
            .unwrap();
        assert_eq!(exact, "Status: nominal");
        // Shares 3 of its 4 tokens with the trigger → score 0.75.
        let fuzzy = engine
            .format_from_trigger("show system status now", &context, None)
            .unwrap();
        assert_eq!(fuzzy, "Status: nominal");
    }

    #[test]
    fn format_from_trigger_no_match() {
        let engine = build_test_engine();
        let err = engine
            .format_from_trigger("completely unrelated", &Context::new(), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::NoTriggerMatch(_)));
    }

    #[test]
    fn format_as_json() {
        let engine = build_test_engine();
        let out = engine
            .format_from_template_as(
                "status",
                &ctx(&[("state", "ok")]),
                None,
                OutputFormat::Json,
            )
            .unwrap();
        assert_eq!(out, r#"{"content":"Status: ok"}"#);
    }

    #[test]
    fn register_templates_extends_catalog() {
        let engine = build_test_engine();
        engine
            .register_templates(vec![make_template("extra", &["more info"], "Extra")])
            .unwrap();
        assert_eq!(
            engine
                .format_from_template("extra", &Context::new(), None)
                .unwrap(),
            "Extra"
        );
    }

    #[test]
    fn register_templates_collects_errors_without_corruption() {
        let engine = build_test_engine();
        let errors = engine
            .register_templates(vec![
                make_template("fresh", &["brand new"], "Fresh"),
                make_template("greeting", &[], "duplicate id"),
                make_template("other", &["say hello"], "duplicate trigger"),
            ])
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        // The valid one landed; the existing catalog is untouched.
        assert!(engine.catalog().get("fresh").is_some());
        assert!(engine.catalog().get("other").is_none());
        assert_eq!(
            engine
                .format_from_template("greeting", &ctx(&[("name", "x")]), None)
                .unwrap(),
            "Hello x"
        );
    }

    #[test]
    fn concurrent_registrations_all_land() {
        use std::sync::Arc;
        use std::thread;

        let engine = Arc::new(build_test_engine());
        let mut workers = Vec::new();
        for n in 0..4 {
            let engine = Arc::clone(&engine);
            workers.push(thread::spawn(move || {
                let id = format!("runtime_{}", n);
                let trigger = format!("runtime trigger {}", n);
                engine
                    .register_templates(vec![make_template(&id, &[trigger.as_str()], "body")])
                    .unwrap();
            }));
        }
        for worker in workers {
            worker.join().unwrap();
        }

        let catalog = engine.catalog();
        for n in 0..4 {
            assert!(catalog.get(&format!("runtime_{}", n)).is_some());
        }
        // The original templates survived every rebuild.
        assert!(catalog.get("greeting").is_some());
        assert!(catalog.get("status").is_some());
    }

    #[test]
    fn list_available_sorted_and_filtered() {
        let engine = build_test_engine();
        let all = engine.list_available(None);
        let ids: Vec<&str> = all.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["greeting", "status"]);
        assert!(engine.list_available(Some("nope")).is_empty());
    }

    #[test]
    fn reload_swaps_catalog() {
        let engine = build_test_engine();
        let mut replacement = Catalog::new();
        replacement
            .register(make_template("only", &["solo"], "Only"))
            .unwrap();
        engine.reload(replacement);
        assert!(engine.catalog().get("greeting").is_none());
        assert!(engine.catalog().get("only").is_some());
    }
}
