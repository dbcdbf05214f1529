//! # Agent Loop
//!
//! The bounded conversation driver. Each round sends the history and the tool
//! catalog to the decision engine, then either finishes with the engine's text
//! or dispatches the requested tools in order and appends their results.
//!
//! Tool failures are ordinary results that flow back into the conversation.
//! Only engine faults, protocol violations and the round limit stop the loop.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::catalog::{ToolSignature, catalog};
use crate::domain::traits::DecisionEngine;
use crate::domain::types::{ConversationTurn, ToolRequest, ToolResult};
use crate::infrastructure::tools::ToolDispatcher;
use crate::strings::messages;

pub const DEFAULT_MAX_ROUNDS: usize = 20;

/// Progress notifications for operator display. They never affect control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    RoundStarted { round: usize },
    Usage { prompt_tokens: u32, response_tokens: u32 },
    /// Agent text that accompanied a batch of tool requests.
    Thinking { text: String },
    ToolsRequested { names: Vec<String> },
    ToolFinished { name: String, result: ToolResult },
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    Engine(String),
    ProtocolViolation(String),
    MaxRounds(usize),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Engine(err) => f.write_str(&messages::engine_failure(err)),
            AbortReason::ProtocolViolation(detail) => f.write_str(&messages::protocol_violation(detail)),
            AbortReason::MaxRounds(rounds) => f.write_str(&messages::max_rounds_reached(*rounds)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed { answer: String },
    Aborted { reason: AbortReason },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    pub history: Vec<ConversationTurn>,
    /// Number of decision-engine calls made.
    pub rounds: usize,
}

#[derive(Debug)]
enum LoopState {
    AwaitingDecision,
    ExecutingTools(Vec<ToolRequest>),
    Done(String),
    Aborted(AbortReason),
}

pub struct AgentLoop {
    engine: Arc<dyn DecisionEngine>,
    dispatcher: ToolDispatcher,
    tools: Vec<ToolSignature>,
    max_rounds: usize,
    events: Option<UnboundedSender<LoopEvent>>,
}

impl AgentLoop {
    pub fn new(engine: Arc<dyn DecisionEngine>, dispatcher: ToolDispatcher) -> Self {
        Self {
            engine,
            dispatcher,
            tools: catalog(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            events: None,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<LoopEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: LoopEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.send(event);
        }
    }

    /// Runs one conversation to completion, starting from `prompt`.
    pub async fn run(&self, prompt: &str) -> RunReport {
        let mut history = vec![ConversationTurn::user(prompt)];
        let mut rounds = 0;
        let mut state = LoopState::AwaitingDecision;

        let outcome = loop {
            state = match state {
                LoopState::AwaitingDecision if rounds >= self.max_rounds => {
                    LoopState::Aborted(AbortReason::MaxRounds(self.max_rounds))
                }
                LoopState::AwaitingDecision => {
                    rounds += 1;
                    self.emit(LoopEvent::RoundStarted { round: rounds });
                    self.await_decision(&mut history).await
                }
                LoopState::ExecutingTools(requests) => self.execute_tools(requests, &mut history).await,
                LoopState::Done(answer) => break Outcome::Completed { answer },
                LoopState::Aborted(reason) => break Outcome::Aborted { reason },
            };
            tracing::trace!(round = rounds, state = ?state, "Loop transition");
        };

        match &outcome {
            Outcome::Completed { .. } => tracing::info!(rounds, "Conversation completed"),
            Outcome::Aborted { reason } => tracing::warn!(rounds, "Conversation aborted: {}", reason),
        }
        self.emit(LoopEvent::Finished);

        RunReport {
            outcome,
            history,
            rounds,
        }
    }

    async fn await_decision(&self, history: &mut Vec<ConversationTurn>) -> LoopState {
        let decision = match self.engine.decide(history, &self.tools).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!("Decision engine failed: {:#}", e);
                return LoopState::Aborted(AbortReason::Engine(format!("{:#}", e)));
            }
        };

        if let Some(usage) = decision.usage {
            self.emit(LoopEvent::Usage {
                prompt_tokens: usage.prompt_tokens,
                response_tokens: usage.response_tokens,
            });
        }

        let text = decision.turn.text();

        if decision.is_final() {
            return match text {
                Some(answer) => {
                    history.push(decision.turn);
                    LoopState::Done(answer)
                }
                None => LoopState::Aborted(AbortReason::ProtocolViolation(
                    "decision engine returned neither text nor tool requests".to_string(),
                )),
            };
        }

        let requests: Vec<ToolRequest> = decision.turn.tool_requests().into_iter().cloned().collect();
        if let Some(text) = text {
            self.emit(LoopEvent::Thinking { text });
        }
        self.emit(LoopEvent::ToolsRequested {
            names: requests.iter().map(|r| r.name.clone()).collect(),
        });

        history.push(decision.turn);
        LoopState::ExecutingTools(requests)
    }

    /// Dispatches sequentially; later requests may depend on earlier side effects.
    async fn execute_tools(&self, requests: Vec<ToolRequest>, history: &mut Vec<ConversationTurn>) -> LoopState {
        for request in &requests {
            let turn = self.dispatcher.dispatch(request).await;

            let Some((_, result)) = turn.tool_response() else {
                return LoopState::Aborted(AbortReason::ProtocolViolation(format!(
                    "dispatch of {} produced no result envelope",
                    request.name
                )));
            };
            self.emit(LoopEvent::ToolFinished {
                name: request.name.clone(),
                result: result.clone(),
            });
            history.push(turn);
        }
        LoopState::AwaitingDecision
    }
}
