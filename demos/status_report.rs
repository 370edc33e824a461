/// Status report example — builds a small catalog and renders the same
/// template at each verbosity tier and output format.
///
/// Run with: cargo run --example status_report

use response_engine::core::catalog::Catalog;
use response_engine::core::engine::ResponseEngine;
use response_engine::core::format::OutputFormat;
use response_engine::schema::template::Verbosity;
use response_engine::schema::value::{Context, Value};

const CATALOG: &str = r#"{
    "deploy_summary": (
        triggers: ["deployment summary", "how did the deploy go"],
        response_type: "detailed",
        context_needed: true,
        verbosity: "concise",
        metadata: {"category": "deployments"},
        content: "Deploy {{release}}: {{outcome}}\n{{#services}}- {{name}} ({{duration}}s)\n{{/services}}{{#if rollback}}A rollback was performed.\n{{/if}}[detailed]Initiated by {{initiator}}.\n[/detailed][expert]Pipeline id: {{pipeline_id}}\n[/expert]",
    ),
}"#;

fn main() {
    let report = Catalog::parse_ron(CATALOG).expect("demo catalog is valid RON");
    for err in &report.errors {
        eprintln!("skipped template: {}", err);
    }
    let engine = ResponseEngine::new(report.catalog);

    let services = vec![
        Context::from([
            ("name".to_string(), Value::from("api")),
            ("duration".to_string(), Value::from(41i64)),
        ]),
        Context::from([
            ("name".to_string(), Value::from("worker")),
            ("duration".to_string(), Value::from(17i64)),
        ]),
    ];
    let context = Context::from([
        ("release".to_string(), Value::from("v2.4.1")),
        ("outcome".to_string(), Value::from("success")),
        ("services".to_string(), Value::List(services)),
        ("rollback".to_string(), Value::from(false)),
        ("initiator".to_string(), Value::from("maya")),
    ]);

    for level in [Verbosity::Concise, Verbosity::Detailed, Verbosity::Expert] {
        println!("--- {} ---", level);
        let text = engine
            .format_from_trigger("how did the deploy go", &context, Some(level))
            .expect("trigger resolves");
        println!("{}", text);
    }

    println!("--- json ---");
    let wrapped = engine
        .format_from_template_as("deploy_summary", &context, None, OutputFormat::Json)
        .expect("template exists");
    println!("{}", wrapped);
}
