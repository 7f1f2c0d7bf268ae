//! Chat widget state machine.
//!
//! Pure state: commands go in, effects come out. The host executes effects
//! (network dispatch, input focus) and feeds replies back as commands.

use log::{debug, info, warn};

use super::message::{Conversation, MessageId, Sender};
use super::reply::{ChatRequest, ReplyOutcome, RequestId};
use crate::selection::bus::SelectionEvent;

/// Where a user message came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Typed,
    Selection,
}

#[derive(Debug)]
pub enum Command {
    Open,
    Close,
    Toggle,
    InputChar(char),
    InputNewline,
    InputBackspace,
    SubmitTyped,
    Selection(SelectionEvent),
    ReplyArrived { id: RequestId, outcome: ReplyOutcome },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Effect {
    FocusInput,
    SendRequest { id: RequestId, request: ChatRequest },
}

#[derive(Debug)]
pub struct ChatState {
    conversation: Conversation,
    input: String,
    open: bool,
    unread: bool,
    in_flight: Option<RequestId>,
    next_request_id: u64,
    api_key: String,
}

impl ChatState {
    pub fn new(api_key: impl Into<String>, greeting: Option<&str>) -> Self {
        Self {
            conversation: Conversation::with_greeting(greeting),
            input: String::new(),
            open: false,
            unread: false,
            in_flight: None,
            next_request_id: 1,
            api_key: api_key.into(),
        }
    }

    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Open => self.open(),
            Command::Close => {
                self.open = false;
                vec![]
            }
            Command::Toggle => {
                if self.open {
                    self.open = false;
                    vec![]
                } else {
                    self.open()
                }
            }
            Command::InputChar(c) => {
                if !self.is_loading() {
                    self.input.push(c);
                }
                vec![]
            }
            Command::InputNewline => {
                if !self.is_loading() {
                    self.input.push('\n');
                }
                vec![]
            }
            Command::InputBackspace => {
                if !self.is_loading() {
                    self.input.pop();
                }
                vec![]
            }
            Command::SubmitTyped => {
                let text = self.input.clone();
                self.submit(&text, Origin::Typed)
            }
            Command::Selection(event) => self.submit(&event.text, Origin::Selection),
            Command::ReplyArrived { id, outcome } => {
                self.reply_arrived(id, outcome);
                vec![]
            }
        }
    }

    fn open(&mut self) -> Vec<Effect> {
        self.open = true;
        self.unread = false;
        vec![Effect::FocusInput]
    }

    fn submit(&mut self, text: &str, origin: Origin) -> Vec<Effect> {
        if let Some(id) = self.in_flight {
            debug!("Rejecting {origin:?} submit while request {} is in flight", id.0);
            return vec![];
        }

        let text = text.trim();
        if text.is_empty() {
            return vec![];
        }

        let message_id = self.conversation.push(Sender::User, text);
        if origin == Origin::Typed {
            self.input.clear();
        }

        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        self.in_flight = Some(id);
        info!("Sending message {message_id} as request {} ({origin:?})", id.0);

        let request = match origin {
            Origin::Typed => ChatRequest::typed(text, self.api_key.clone()),
            Origin::Selection => ChatRequest::from_selection(text, self.api_key.clone()),
        };
        vec![Effect::SendRequest { id, request }]
    }

    fn reply_arrived(&mut self, id: RequestId, outcome: ReplyOutcome) -> Option<MessageId> {
        if self.in_flight != Some(id) {
            warn!("Dropping reply for stale request {}", id.0);
            return None;
        }
        self.in_flight = None;

        let text = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Request {} failed: {e}", id.0);
                e.user_message()
            }
        };

        let message_id = self.conversation.push(Sender::Bot, text);
        if !self.open {
            self.unread = true;
        }
        Some(message_id)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn has_unread(&self) -> bool {
        self.unread
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading() && !self.input.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::message::Message;
    use crate::chat::reply::ReplyError;

    fn state() -> ChatState {
        ChatState::new("secret", None)
    }

    fn type_text(state: &mut ChatState, text: &str) {
        for c in text.chars() {
            let _ = state.apply(Command::InputChar(c));
        }
    }

    fn sent_id(effects: &[Effect]) -> RequestId {
        match effects {
            [Effect::SendRequest { id, .. }] => *id,
            other => panic!("expected one SendRequest, got {other:?}"),
        }
    }

    fn texts(state: &ChatState) -> Vec<&str> {
        state.conversation().messages().iter().map(Message::text).collect()
    }

    #[test]
    fn starts_closed_and_idle() {
        let state = state();
        assert!(!state.is_open());
        assert!(!state.has_unread());
        assert!(!state.is_loading());
        assert!(state.conversation().is_empty());
    }

    #[test]
    fn open_focuses_input_and_close_has_no_effects() {
        let mut state = state();
        assert_eq!(state.apply(Command::Open), vec![Effect::FocusInput]);
        assert!(state.is_open());
        assert!(state.apply(Command::Close).is_empty());
        assert!(!state.is_open());
    }

    #[test]
    fn typed_submit_appends_user_message_and_clears_input() {
        let mut state = state();
        type_text(&mut state, "  hello ");

        let effects = state.apply(Command::SubmitTyped);
        assert_eq!(
            effects,
            vec![Effect::SendRequest {
                id: RequestId(1),
                request: ChatRequest::typed("hello", "secret"),
            }]
        );
        assert_eq!(texts(&state), vec!["hello"]);
        assert_eq!(state.input(), "");
        assert!(state.is_loading());
    }

    #[test]
    fn blank_input_is_not_submitted() {
        let mut state = state();
        type_text(&mut state, " \t");
        let _ = state.apply(Command::InputNewline);
        assert!(state.apply(Command::SubmitTyped).is_empty());
        assert!(state.conversation().is_empty());
        assert_eq!(state.input(), " \t\n");
    }

    #[test]
    fn second_submit_is_rejected_while_loading() {
        let mut state = state();
        type_text(&mut state, "first");
        let _ = state.apply(Command::SubmitTyped);

        let before = state.conversation().len();
        let effects = state.apply(Command::Selection(SelectionEvent::new("second", 0)));
        assert!(effects.is_empty());
        assert_eq!(state.conversation().len(), before);
    }

    #[test]
    fn typing_is_ignored_while_loading() {
        let mut state = state();
        type_text(&mut state, "q");
        let _ = state.apply(Command::SubmitTyped);
        type_text(&mut state, "abc");
        let _ = state.apply(Command::InputBackspace);
        assert_eq!(state.input(), "");
        assert!(!state.can_submit());
    }

    #[test]
    fn reply_success_appends_bot_message() {
        let mut state = state();
        let _ = state.apply(Command::Open);
        type_text(&mut state, "hello");
        let id = sent_id(&state.apply(Command::SubmitTyped));

        let effects = state.apply(Command::ReplyArrived {
            id,
            outcome: Ok("hi there".into()),
        });
        assert!(effects.is_empty());
        assert_eq!(texts(&state), vec!["hello", "hi there"]);
        assert!(!state.is_loading());
        assert!(!state.has_unread());
    }

    #[test]
    fn reply_failure_becomes_transcript_message() {
        let mut state = state();
        type_text(&mut state, "hello");
        let id = sent_id(&state.apply(Command::SubmitTyped));

        let error = ReplyError::NotFound {
            endpoint: "http://localhost:8000/chat".into(),
        };
        let _ = state.apply(Command::ReplyArrived {
            id,
            outcome: Err(error.clone()),
        });

        assert_eq!(state.conversation().len(), 2);
        let last = state.conversation().last().unwrap();
        assert!(last.is_bot());
        assert_eq!(last.text(), error.user_message());
        assert!(!state.is_loading());
        assert!(state.has_unread());
    }

    #[test]
    fn selection_while_closed_sends_and_marks_unread() {
        let mut state = state();
        type_text(&mut state, "draft");

        let effects = state.apply(Command::Selection(SelectionEvent::new("explain torque", 42)));
        let id = sent_id(&effects);
        assert_eq!(
            effects,
            vec![Effect::SendRequest {
                id,
                request: ChatRequest::from_selection("explain torque", "secret"),
            }]
        );
        // selection sends leave the typed buffer alone
        assert_eq!(state.input(), "draft");
        assert!(!state.has_unread());

        let _ = state.apply(Command::ReplyArrived {
            id,
            outcome: Ok("Torque is...".into()),
        });
        assert!(state.has_unread());

        let _ = state.apply(Command::Open);
        assert!(!state.has_unread());
    }

    #[test]
    fn whitespace_selection_is_ignored() {
        let mut state = state();
        assert!(
            state
                .apply(Command::Selection(SelectionEvent::new("   ", 0)))
                .is_empty()
        );
        assert!(state.conversation().is_empty());
    }

    #[test]
    fn stale_reply_is_dropped() {
        let mut state = state();
        type_text(&mut state, "hello");
        let id = sent_id(&state.apply(Command::SubmitTyped));

        let _ = state.apply(Command::ReplyArrived {
            id: RequestId(id.0 + 10),
            outcome: Ok("wrong".into()),
        });
        assert_eq!(state.conversation().len(), 1);
        assert!(state.is_loading());
    }

    #[test]
    fn greeting_does_not_raise_unread() {
        let state = ChatState::new("", Some("Hello! I'm your AI assistant."));
        assert_eq!(state.conversation().len(), 1);
        assert!(!state.has_unread());
    }

    #[test]
    fn toggle_flips_visibility() {
        let mut state = state();
        assert_eq!(state.apply(Command::Toggle), vec![Effect::FocusInput]);
        assert!(state.is_open());
        assert!(state.apply(Command::Toggle).is_empty());
        assert!(!state.is_open());
    }

    #[test]
    fn each_resolution_adds_exactly_one_message() {
        let mut state = state();
        let outcomes: Vec<ReplyOutcome> = vec![
            Ok("one".into()),
            Err(ReplyError::Server { status: 500 }),
            Err(ReplyError::Timeout),
            Ok("four".into()),
        ];

        for (i, outcome) in outcomes.into_iter().enumerate() {
            type_text(&mut state, &format!("question {i}"));
            let before = state.conversation().len();
            let id = sent_id(&state.apply(Command::SubmitTyped));
            assert_eq!(state.conversation().len(), before + 1);

            let _ = state.apply(Command::ReplyArrived { id, outcome });
            assert_eq!(state.conversation().len(), before + 2);
        }

        let senders: Vec<Sender> = state
            .conversation()
            .messages()
            .iter()
            .map(Message::sender)
            .collect();
        assert!(senders.chunks(2).all(|pair| pair == [Sender::User, Sender::Bot]));
    }
}
