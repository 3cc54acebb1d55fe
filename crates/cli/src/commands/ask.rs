//! `shopagent ask`: answer one question end to end.

use std::sync::Arc;

use shopagent_agent::{AgentGraph, AgentOutcome, EventSink, GraphEvent};
use shopagent_config::{AppConfig, ProviderKind};
use shopagent_providers::build_from_config;
use shopagent_retrieval::Retriever;
use tokio::sync::mpsc;

pub struct AskOptions {
    pub question: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub stream: bool,
    pub json: bool,
}

/// Apply `--provider` / `--model`. A provider without a model switches to
/// that provider's default model.
pub fn apply_overrides(
    config: &mut AppConfig,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<(), String> {
    if let Some(provider) = provider {
        let kind: ProviderKind = provider.parse()?;
        config.default_provider = kind.as_str().to_string();
        config.default_model = kind.default_model().to_string();
    }
    if let Some(model) = model {
        config.default_model = model.to_string();
    }
    Ok(())
}

pub async fn run(options: AskOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    apply_overrides(&mut config, options.provider.as_deref(), options.model.as_deref())?;
    config.validate()?;

    let providers = build_from_config(&config)?;
    let agent_provider = providers.get(config.default_provider_kind()?)?;
    let router_provider = providers.get(config.router_provider_kind()?)?;
    // The catalogue was embedded with an OpenAI embedding model.
    let embedder = providers.get(ProviderKind::OpenAi)?;

    let retriever = Arc::new(Retriever::from_config(&config.retrieval, embedder));
    let registry = shopagent_tools::default_registry(retriever.clone());
    let graph = AgentGraph::from_config(&config, router_provider, agent_provider, registry)
        .with_enrichment(retriever);

    let messages = vec![shopagent_core::Message::user(&options.question)];
    let outcome = if options.stream {
        let (tx, mut rx) = mpsc::channel(32);
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let GraphEvent::NodeStarted { status, .. } = event {
                    eprintln!("  {status}");
                }
            }
        });
        let outcome = graph.run_with_events(messages, EventSink::new(Some(tx))).await;
        // The sender is dropped with the graph run; wait for the printer to drain.
        let _ = printer.await;
        outcome
    } else {
        graph.run(messages).await
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &AgentOutcome) {
    println!("{}", outcome.answer);

    if !outcome.used_context.is_empty() {
        println!();
        println!("  Products:");
        for item in &outcome.used_context {
            let price = item
                .price
                .map(|p| format!("${p:.2}"))
                .unwrap_or_else(|| "price n/a".into());
            println!("    {} — {} ({price})", item.id, item.description);
            if let Some(url) = &item.image_url {
                println!("      {url}");
            }
        }
    }

    tracing::debug!(
        trace_id = %outcome.trace_id,
        termination = %outcome.termination,
        iterations = outcome.iterations,
        total_tokens = outcome.usage.total_tokens,
        "Outcome"
    );
}
