//! The agent graph: Start → IntentRouter → Agent ⇄ Tools → End.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use shopagent_config::AppConfig;
use shopagent_core::message::Message;
use shopagent_core::provider::Provider;
use shopagent_core::tool::ToolRegistry;
use shopagent_retrieval::Retriever;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::nodes::{AgentNode, IntentRouterNode, ModelSettings, ToolNode};
use crate::outcome::{AgentOutcome, TerminationReason};
use crate::state::{ConversationState, StateDelta};
use crate::stream_event::{EventSink, GraphEvent, GraphNode};

/// Agent steps allowed before the run is cut off. The agent node runs at
/// most `MAX_AGENT_ITERATIONS + 1` times.
pub const MAX_AGENT_ITERATIONS: u32 = 2;

/// Answer when the run hits the cap without any usable answer text.
pub const ITERATION_CAP_ANSWER: &str =
    "I couldn't finish looking into that. Please try a more specific question.";

/// Answer when the request deadline expires.
pub const DEADLINE_ANSWER: &str =
    "Sorry, that took too long to answer. Please try again in a moment.";

/// End the run with `answer`, first closing any tool calls the agent
/// requested that never ran, so every tool-call turn has its results.
pub fn closing_delta(state: &ConversationState, answer: &str, skipped_because: &str) -> StateDelta {
    let mut messages: Vec<Message> = state
        .tool_calls
        .iter()
        .map(|call| {
            let content = format!("Error: not executed, {skipped_because}");
            Message::tool_result(&call.id, &call.name, content)
        })
        .collect();
    messages.push(Message::assistant(answer));
    StateDelta {
        messages,
        answer: Some(answer.to_string()),
        tool_calls: Some(Vec::new()),
        ..StateDelta::default()
    }
}

/// Where the graph goes after the agent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRoute {
    Tools,
    End(TerminationReason),
}

/// Edge function for the agent node. The iteration cap is checked before
/// the pending tool calls.
pub fn route_after_agent(state: &ConversationState) -> AgentRoute {
    if let Some(reason) = state.forced_termination {
        AgentRoute::End(reason)
    } else if state.final_answer {
        AgentRoute::End(TerminationReason::FinalAnswer)
    } else if state.iteration > MAX_AGENT_ITERATIONS {
        AgentRoute::End(TerminationReason::IterationCap)
    } else if state.tool_calls.is_empty() {
        AgentRoute::End(TerminationReason::NoToolCalls)
    } else {
        AgentRoute::Tools
    }
}

pub struct AgentGraph {
    router: IntentRouterNode,
    agent: AgentNode,
    tools: ToolNode,
    deadline: Duration,
    enricher: Option<Arc<Retriever>>,
}

impl AgentGraph {
    pub fn new(router: IntentRouterNode, agent: AgentNode, tools: ToolNode) -> Self {
        Self {
            router,
            agent,
            tools,
            deadline: Duration::from_secs(120),
            enricher: None,
        }
    }

    /// Wire the graph from configuration. Provider selection happens in the caller.
    pub fn from_config(
        config: &AppConfig,
        router_provider: Arc<dyn Provider>,
        agent_provider: Arc<dyn Provider>,
        registry: ToolRegistry,
    ) -> Self {
        let router = IntentRouterNode::new(
            router_provider,
            ModelSettings::new(&config.router.model)
                .with_temperature(config.router.temperature)
                .with_max_tokens(config.default_max_tokens),
        )
        .with_prompt(config.prompts.router_template());

        let agent = AgentNode::new(
            agent_provider,
            ModelSettings::new(&config.default_model)
                .with_temperature(config.default_temperature)
                .with_max_tokens(config.default_max_tokens),
            registry.definitions(),
        )
        .with_template(config.prompts.agent_template());

        Self::new(router, agent, ToolNode::new(registry))
            .with_deadline(Duration::from_secs(config.agent.request_timeout_secs))
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Look up cited items in the catalogue once the run ends.
    pub fn with_enrichment(mut self, retriever: Arc<Retriever>) -> Self {
        self.enricher = Some(retriever);
        self
    }

    /// Answer the last user message in `messages`.
    pub async fn run(&self, messages: Vec<Message>) -> AgentOutcome {
        self.run_with_events(messages, EventSink::default()).await
    }

    /// Like [`run`](Self::run), reporting progress on `events`.
    pub async fn run_with_events(&self, messages: Vec<Message>, events: EventSink) -> AgentOutcome {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("agent_run", trace_id = %trace_id);
        self.run_traced(trace_id, messages, events).instrument(span).await
    }

    async fn run_traced(
        &self,
        trace_id: String,
        messages: Vec<Message>,
        events: EventSink,
    ) -> AgentOutcome {
        info!(messages = messages.len(), "Agent run started");
        let initial = ConversationState::new(messages, self.tools.registry().describe());

        // Holds the latest state so a timed-out run still returns its transcript.
        let checkpoint = Mutex::new(initial.clone());

        let finished =
            tokio::time::timeout(self.deadline, self.drive(initial, &checkpoint, &events)).await;
        let (state, termination) = match finished {
            Ok(finished) => finished,
            Err(_) => {
                warn!(deadline_ms = self.deadline.as_millis() as u64, "Agent run deadline exceeded");
                let state = checkpoint.into_inner().unwrap_or_else(|e| e.into_inner());
                let delta = closing_delta(&state, DEADLINE_ANSWER, "request deadline exceeded");
                (state.apply(delta), TerminationReason::DeadlineExceeded)
            }
        };

        let used_context = match &self.enricher {
            Some(retriever) if !state.references.is_empty() => {
                retriever.used_context(&state.references).await
            }
            _ => Vec::new(),
        };

        info!(
            termination = %termination,
            iterations = state.iteration,
            references = state.references.len(),
            total_tokens = state.usage.total_tokens,
            "Agent run finished"
        );
        // The run is over; never wait on a slow receiver.
        events.try_emit(GraphEvent::Finished {
            trace_id: trace_id.clone(),
            termination,
            iterations: state.iteration,
            usage: state.usage,
        });

        AgentOutcome {
            trace_id,
            answer: state.answer,
            references: state.references,
            used_context,
            transcript: state.messages,
            iterations: state.iteration,
            usage: state.usage,
            termination,
        }
    }

    async fn drive(
        &self,
        state: ConversationState,
        checkpoint: &Mutex<ConversationState>,
        events: &EventSink,
    ) -> (ConversationState, TerminationReason) {
        let save = |state: &ConversationState| {
            let mut slot = checkpoint.lock().unwrap_or_else(|e| e.into_inner());
            *slot = state.clone();
        };

        events
            .emit(GraphEvent::started(GraphNode::IntentRouter, "Analyzing the question..."))
            .await;
        let delta = self.router.run(&state).await;
        let mut state = state.apply(delta);
        save(&state);

        if !state.question_relevant {
            return (state, TerminationReason::NotRelevant);
        }

        loop {
            events.emit(GraphEvent::started(GraphNode::Agent, "Planning...")).await;
            let delta = self.agent.run(&state).await;
            state = state.apply(delta);
            save(&state);

            match route_after_agent(&state) {
                AgentRoute::End(TerminationReason::IterationCap) => {
                    let answer = match state.answer.trim() {
                        "" => ITERATION_CAP_ANSWER.to_string(),
                        best => best.to_string(),
                    };
                    let delta = closing_delta(&state, &answer, "step limit reached");
                    return (state.apply(delta), TerminationReason::IterationCap);
                }
                AgentRoute::End(reason) => return (state, reason),
                AgentRoute::Tools => {
                    debug!(iteration = state.iteration, calls = state.tool_calls.len(), "Running tools");
                    let delta = self.tools.run(&state, events).await;
                    state = state.apply(delta);
                    save(&state);
                }
            }
        }
    }
}
