//! Debounced reply scheduling
//!
//! Every public inbound message joins its conversation's burst and schedules
//! a deferred evaluation `response_delay` later. There is no cancellation:
//! an evaluation compares its ticket against the burst generation when it
//! fires and again right before committing, and quietly does nothing when a
//! newer message has taken over. Once a burst is older than `max_wait` the
//! evaluation proceeds regardless so a customer who keeps typing still gets
//! an answer.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use support_agent_config::SchedulerConfig;
use support_agent_core::{BurstTicket, Clock, ConversationMessage, ConversationStore, ReplySink};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::composer::ReplyComposer;
use crate::AgentError;

/// How one scheduled evaluation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A reply was delivered
    Sent,
    /// A newer message superseded this evaluation
    Stale,
    /// Nothing left to answer
    EmptyBatch,
    /// The conversation was handed to a human
    Handoff,
    /// Generation or delivery failed; logged and dropped
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Sent => "sent",
            Outcome::Stale => "stale",
            Outcome::EmptyBatch => "empty_batch",
            Outcome::Handoff => "handoff",
            Outcome::Error => "error",
        }
    }
}

struct SchedulerInner {
    config: SchedulerConfig,
    store: Arc<dyn ConversationStore>,
    sink: Arc<dyn ReplySink>,
    composer: Arc<ReplyComposer>,
    clock: Arc<dyn Clock>,
    workers: Arc<Semaphore>,
}

/// Debounces inbound bursts into single replies
#[derive(Clone)]
pub struct ResponseScheduler {
    inner: Arc<SchedulerInner>,
}

impl ResponseScheduler {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn ConversationStore>,
        sink: Arc<dyn ReplySink>,
        composer: Arc<ReplyComposer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(config.workers.max(1)));
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                store,
                sink,
                composer,
                clock,
                workers,
            }),
        }
    }

    /// Schedule an evaluation for a stored message
    ///
    /// Private notes and outbound messages never schedule work.
    pub async fn on_inbound(
        &self,
        message: &ConversationMessage,
    ) -> Result<Option<JoinHandle<Outcome>>, AgentError> {
        if !message.is_public_inbound() {
            tracing::debug!(
                conversation_id = %message.conversation_id,
                message_id = %message.id,
                "Ignoring non-public or outbound message"
            );
            return Ok(None);
        }
        self.schedule(&message.conversation_id, &message.id, message.created_at)
            .await
            .map(Some)
    }

    /// Join the burst and run the evaluation after `response_delay`
    pub async fn schedule(
        &self,
        conversation_id: &str,
        trigger_message_id: &str,
        enqueued_at: DateTime<Utc>,
    ) -> Result<JoinHandle<Outcome>, AgentError> {
        let ticket = self
            .inner
            .store
            .join_burst(conversation_id, trigger_message_id, enqueued_at)
            .await?;

        tracing::debug!(
            conversation_id = %conversation_id,
            message_id = %trigger_message_id,
            generation = ticket.generation,
            burst_started_at = %ticket.started_at,
            "Scheduled reply evaluation"
        );

        let scheduler = self.clone();
        let conversation_id = conversation_id.to_string();
        let trigger_message_id = trigger_message_id.to_string();
        let delay = self.inner.config.response_delay();

        Ok(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _permit = match scheduler.inner.workers.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, "Worker pool closed");
                    return Outcome::Error;
                },
            };
            scheduler
                .evaluate(&conversation_id, &trigger_message_id, ticket)
                .await
        }))
    }

    /// Run one evaluation now
    ///
    /// Never fails: errors are logged and reported as [`Outcome::Error`]
    /// without retrying, since a later evaluation may already cover the
    /// burst.
    pub async fn evaluate(
        &self,
        conversation_id: &str,
        trigger_message_id: &str,
        ticket: BurstTicket,
    ) -> Outcome {
        let outcome = match self.run(conversation_id, trigger_message_id, ticket).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    conversation_id = %conversation_id,
                    generation = ticket.generation,
                    error = %e,
                    "Reply evaluation failed"
                );
                Outcome::Error
            },
        };

        metrics::counter!("support_agent_replies_total", "outcome" => outcome.as_str())
            .increment(1);
        outcome
    }

    async fn run(
        &self,
        conversation_id: &str,
        trigger_message_id: &str,
        ticket: BurstTicket,
    ) -> Result<Outcome, AgentError> {
        let inner = &self.inner;

        if !self.is_fresh(conversation_id, trigger_message_id, ticket).await? {
            tracing::info!(
                conversation_id = %conversation_id,
                generation = ticket.generation,
                "Skipping, newer message exists"
            );
            return Ok(Outcome::Stale);
        }

        let batch = inner.store.pending_inbound(conversation_id).await?;
        if batch.is_empty() {
            tracing::debug!(conversation_id = %conversation_id, "No pending messages");
            inner.store.close_burst(conversation_id, ticket.generation).await?;
            return Ok(Outcome::EmptyBatch);
        }

        let history_limit = inner.composer.config().max_history_messages;
        let batch_ids: HashSet<&str> = batch.iter().map(|m| m.id.as_str()).collect();
        let mut history = inner
            .store
            .recent_history(conversation_id, history_limit + batch.len())
            .await?;
        history.retain(|m| !batch_ids.contains(m.id.as_str()));

        let channel = inner.store.channel(conversation_id).await?;

        tracing::info!(
            conversation_id = %conversation_id,
            pending = batch.len(),
            history = history.len(),
            channel = ?channel,
            "Composing reply"
        );
        let reply = inner.composer.compose(&batch, &history, channel).await?;

        if !self.is_fresh(conversation_id, trigger_message_id, ticket).await? {
            tracing::info!(
                conversation_id = %conversation_id,
                generation = ticket.generation,
                "Reply cancelled, new message arrived during generation"
            );
            return Ok(Outcome::Stale);
        }

        for outbound in reply.outbound {
            inner.sink.deliver(conversation_id, outbound).await?;
        }
        inner.store.close_burst(conversation_id, ticket.generation).await?;

        tracing::info!(
            conversation_id = %conversation_id,
            intents = ?reply.intent.intents,
            handoff = reply.handoff,
            "Reply committed"
        );

        Ok(if reply.handoff {
            Outcome::Handoff
        } else {
            Outcome::Sent
        })
    }

    /// Fresh while no newer message joined the burst, or once the current
    /// burst has waited `max_wait`
    ///
    /// A ticket whose messages were already covered by a committed reply is
    /// never fresh, even past `max_wait`.
    async fn is_fresh(
        &self,
        conversation_id: &str,
        trigger_message_id: &str,
        ticket: BurstTicket,
    ) -> Result<bool, AgentError> {
        let inner = &self.inner;

        let Some(state) = inner.store.burst_state(conversation_id).await? else {
            return Ok(false);
        };
        if ticket.generation <= state.committed_generation {
            return Ok(false);
        }

        // Moves forward whenever a reply is committed
        let elapsed = (inner.clock.now() - state.started_at)
            .to_std()
            .unwrap_or_default();
        if elapsed >= inner.config.max_wait() {
            tracing::info!(
                conversation_id = %conversation_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "Max wait exceeded, responding now"
            );
            return Ok(true);
        }

        if state.generation != ticket.generation {
            return Ok(false);
        }

        let latest = inner.store.latest_inbound(conversation_id).await?;
        Ok(latest.is_some_and(|m| m.id == trigger_message_id))
    }
}
