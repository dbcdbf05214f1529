//! # Domain Traits
//!
//! Abstract interfaces for external collaborators.
//! Allows for pluggable implementations in the Infrastructure layer.

use async_trait::async_trait;

use crate::domain::catalog::ToolSignature;
use crate::domain::types::{ConversationTurn, Decision};

/// The external agent that picks the next step of a conversation.
///
/// Given the full history and the tool catalog it returns either a final
/// answer (a turn without tool calls) or a batch of tool requests.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn decide(
        &self,
        history: &[ConversationTurn],
        tools: &[ToolSignature],
    ) -> anyhow::Result<Decision>;
}
