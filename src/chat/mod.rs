//! Floating assistant chat: transcript state, reply transport and worker

pub mod client;
pub mod message;
pub mod reply;
pub mod service;
pub mod state;
pub mod worker;

pub use client::{HttpReplyClient, ReplyTransport, check_health};
pub use message::{Conversation, Message, MessageId, Sender};
pub use reply::{ChatReply, ChatRequest, ReplyError, ReplyOutcome, RequestId};
pub use service::ChatService;
pub use state::{ChatState, Command, Effect, Origin};
pub use worker::{CancelToken, ReplyCompletion, ReplyWorker};
