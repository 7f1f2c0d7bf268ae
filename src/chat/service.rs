//! Chat service - the mounted chat widget.
//!
//! Owns the state machine, the reply worker and the selection subscription.
//! Dropping the service unsubscribes from the bus and cancels any request
//! still in flight.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::debug;

use super::client::{HttpReplyClient, ReplyTransport};
use super::state::{ChatState, Command, Effect};
use super::worker::ReplyWorker;
use crate::selection::bus::{SelectionBus, SelectionSubscription};
use crate::settings::ChatConfig;

pub struct ChatService {
    state: ChatState,
    worker: ReplyWorker,
    selections: SelectionSubscription,
    input_focused: bool,
}

impl ChatService {
    /// Mount a chat widget talking to the configured HTTP endpoint
    pub fn new(config: &ChatConfig, bus: &SelectionBus) -> Result<Self> {
        let client = HttpReplyClient::new(config.endpoint_url.clone(), config.request_timeout)?;
        Ok(Self::with_transport(config, bus, Arc::new(client)))
    }

    pub fn with_transport(
        config: &ChatConfig,
        bus: &SelectionBus,
        transport: Arc<dyn ReplyTransport>,
    ) -> Self {
        Self {
            state: ChatState::new(config.api_key.clone(), config.greeting.as_deref()),
            worker: ReplyWorker::new(transport),
            selections: bus.subscribe(),
            input_focused: false,
        }
    }

    pub fn apply(&mut self, cmd: Command) {
        if matches!(cmd, Command::Close) {
            self.input_focused = false;
        }
        let effects = self.state.apply(cmd);
        self.execute_effects(effects);
        if !self.state.is_open() {
            self.input_focused = false;
        }
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FocusInput => self.input_focused = true,
                Effect::SendRequest { id, request } => self.worker.dispatch(id, request),
            }
        }
    }

    /// Apply finished replies and pending selection events.
    /// Returns true when anything was processed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;

        for completion in self.worker.poll() {
            self.apply(Command::ReplyArrived {
                id: completion.id,
                outcome: completion.outcome,
            });
            changed = true;
        }

        for event in self.selections.drain() {
            debug!("Chat received selection captured at {}", event.timestamp_ms);
            self.apply(Command::Selection(event));
            changed = true;
        }

        changed
    }

    /// Block until the in-flight reply lands or `timeout` elapses
    pub fn wait_for_reply(&mut self, timeout: Duration) -> bool {
        match self.worker.recv_timeout(timeout) {
            Some(completion) => {
                self.apply(Command::ReplyArrived {
                    id: completion.id,
                    outcome: completion.outcome,
                });
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn is_input_focused(&self) -> bool {
        self.input_focused
    }
}
