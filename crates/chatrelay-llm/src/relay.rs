//! Streaming relay engine.
//!
//! A [`StreamRelay`] owns one upstream byte stream and one downstream
//! [`RelayEvent`] channel for its whole life. It reassembles lines across
//! network chunks, routes each delta fragment to the reasoning or answer
//! channel in arrival order, and accumulates both texts for the
//! persistence hand-off.
//!
//! ```text
//!   Open ──(upstream ends)──▶ Closing ──(Completed sent)──▶ Closed
//!     │                                                       ▲
//!     ├──(transport error: Failed sent)───────────────────────┤
//!     └──(downstream gone)────────────────────────────────────┘
//! ```
//!
//! All buffers are owned by the relay; nothing is shared between streams.

use std::fmt;
use std::pin::pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use chatrelay_types::{CompletionResult, PartialPolicy, RelayEvent, StreamEvent};

use crate::classify::describe_transport;
use crate::persist::{ConversationRecord, PersistencePool};
use crate::sse::{DeltaFragments, LineBuffer, SseLine, classify_line, parse_delta};

/// Lifecycle of a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Receiving upstream chunks.
    Open,
    /// Upstream finished; flushing the remainder and notifying downstream.
    Closing,
    /// Downstream notified (or gone); accumulation finalized.
    Closed,
}

/// Whether the downstream consumer is still there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    DownstreamGone,
}

/// How a relay ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream finished and downstream was told so.
    Completed(CompletionResult),
    /// Upstream transport failed; downstream received a `Failed` event.
    Failed { message: String },
    /// Downstream went away. `partial` holds what had been delivered.
    Disconnected { partial: CompletionResult },
}

impl RelayOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RelayOutcome::Completed(_))
    }
}

/// Per-stream relay state machine.
pub struct StreamRelay {
    tx: mpsc::Sender<RelayEvent>,
    lines: LineBuffer,
    reasoning: String,
    answer: String,
    state: RelayState,
    model: String,
    conversation_id: Option<String>,
    persistence: Option<Arc<PersistencePool>>,
    on_disconnect: PartialPolicy,
    events: usize,
    malformed: usize,
}

impl StreamRelay {
    pub fn new(tx: mpsc::Sender<RelayEvent>) -> Self {
        Self {
            tx,
            lines: LineBuffer::new(),
            reasoning: String::new(),
            answer: String::new(),
            state: RelayState::Open,
            model: String::new(),
            conversation_id: None,
            persistence: None,
            on_disconnect: PartialPolicy::default(),
            events: 0,
            malformed: 0,
        }
    }

    /// Model id, for log context only.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_conversation_id(mut self, id: Option<String>) -> Self {
        self.conversation_id = id;
        self
    }

    /// Hand finished text to `pool`; `on_disconnect` decides what happens
    /// to partial text when the consumer leaves early.
    pub fn with_persistence(mut self, pool: Arc<PersistencePool>, on_disconnect: PartialPolicy) -> Self {
        self.persistence = Some(pool);
        self.on_disconnect = on_disconnect;
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Malformed events skipped so far.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Drive the relay over an upstream byte stream until it ends, fails,
    /// or the downstream consumer goes away. The upstream is dropped (and
    /// its connection released) as soon as this returns.
    pub async fn run<S, B, E>(mut self, upstream: S) -> RelayOutcome
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        enum Next<T> {
            Item(Option<T>),
            DownstreamGone,
        }

        let mut upstream = pin!(upstream);
        loop {
            let next = tokio::select! {
                biased;
                () = self.tx.closed() => Next::DownstreamGone,
                item = upstream.next() => Next::Item(item),
            };
            match next {
                Next::DownstreamGone => return self.disconnected().await,
                Next::Item(Some(Ok(chunk))) => {
                    if self.push_chunk(chunk.as_ref()).await == Flow::DownstreamGone {
                        return self.disconnected().await;
                    }
                }
                Next::Item(Some(Err(e))) => return self.fail(describe_transport(&e)).await,
                Next::Item(None) => break,
            }
        }
        self.finish().await
    }

    /// Feed one network chunk and forward every complete line it closes.
    pub async fn push_chunk(&mut self, chunk: &[u8]) -> Flow {
        trace!(bytes = chunk.len(), buffered = self.lines.len(), "upstream chunk");
        self.lines.extend(chunk);
        while let Some(line) = self.lines.next_line() {
            if self.handle_line(&line).await == Flow::DownstreamGone {
                return Flow::DownstreamGone;
            }
        }
        Flow::Continue
    }

    /// Upstream ended normally: flush the partial line once, notify the
    /// consumer, and hand the accumulation off.
    pub async fn finish(mut self) -> RelayOutcome {
        self.transition(RelayState::Closing);

        if let Some(rest) = self.lines.take_remainder()
            && self.handle_line(&rest).await == Flow::DownstreamGone
        {
            return self.disconnected().await;
        }
        if self.tx.send(RelayEvent::Completed).await.is_err() {
            return self.disconnected().await;
        }

        self.transition(RelayState::Closed);
        let result = self.take_result();
        info!(
            model = %self.model,
            events = self.events,
            malformed = self.malformed,
            answer_len = result.answer.len(),
            reasoning_len = result.reasoning.as_ref().map_or(0, String::len),
            "stream complete"
        );
        self.hand_off(result.clone(), false).await;
        RelayOutcome::Completed(result)
    }

    /// Upstream transport failed: notify the consumer, close the channel,
    /// and discard the accumulation.
    pub async fn fail(mut self, message: String) -> RelayOutcome {
        warn!(model = %self.model, error = %message, "upstream stream failed");
        if self
            .tx
            .send(RelayEvent::Failed {
                message: message.clone(),
            })
            .await
            .is_err()
        {
            debug!("downstream already gone, error not delivered");
        }
        self.transition(RelayState::Closed);
        RelayOutcome::Failed { message }
    }

    async fn disconnected(mut self) -> RelayOutcome {
        self.transition(RelayState::Closed);
        let partial = self.take_result();
        info!(
            model = %self.model,
            events = self.events,
            policy = ?self.on_disconnect,
            "downstream disconnected, stopping upstream"
        );
        if self.on_disconnect == PartialPolicy::Persist
            && (!partial.answer.is_empty() || partial.reasoning.is_some())
        {
            self.hand_off(partial.clone(), true).await;
        }
        RelayOutcome::Disconnected { partial }
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        match classify_line(line) {
            SseLine::Ignored => Flow::Continue,
            SseLine::Done => {
                debug!(model = %self.model, "[DONE] sentinel received");
                Flow::Continue
            }
            SseLine::Payload(payload) => match parse_delta(payload) {
                Ok(fragments) => self.forward(fragments).await,
                Err(e) => {
                    self.malformed += 1;
                    warn!(model = %self.model, error = %e, raw = %payload, "skipping malformed stream event");
                    Flow::Continue
                }
            },
        }
    }

    /// Reasoning before answer within one delta.
    async fn forward(&mut self, fragments: DeltaFragments) -> Flow {
        if let Some(text) = fragments.reasoning {
            if self.emit(StreamEvent::reasoning(text.clone())).await == Flow::DownstreamGone {
                return Flow::DownstreamGone;
            }
            self.reasoning.push_str(&text);
        }
        if let Some(text) = fragments.content {
            if self.emit(StreamEvent::answer(text.clone())).await == Flow::DownstreamGone {
                return Flow::DownstreamGone;
            }
            self.answer.push_str(&text);
        }
        Flow::Continue
    }

    async fn emit(&mut self, event: StreamEvent) -> Flow {
        trace!(channel = ?event.channel, len = event.text.len(), "forwarding fragment");
        if self.tx.send(RelayEvent::Delta(event)).await.is_err() {
            return Flow::DownstreamGone;
        }
        self.events += 1;
        Flow::Continue
    }

    fn take_result(&mut self) -> CompletionResult {
        CompletionResult::new(
            std::mem::take(&mut self.answer),
            std::mem::take(&mut self.reasoning),
        )
    }

    async fn hand_off(&self, result: CompletionResult, partial: bool) {
        if let Some(pool) = &self.persistence {
            let record = ConversationRecord::new(self.conversation_id.clone(), result, partial);
            pool.submit(record).await;
        }
    }

    fn transition(&mut self, next: RelayState) {
        debug!(model = %self.model, from = ?self.state, to = ?next, "relay state");
        self.state = next;
    }
}

impl fmt::Debug for StreamRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRelay")
            .field("state", &self.state)
            .field("model", &self.model)
            .field("buffered", &self.lines.len())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
