//! Slack integration for AWEbot.
//!
//! - **Wire** (`wire`) - decode slash commands, interactive payloads and Events API bodies
//! - **Events** (`events`) - the normalized inbound event model
//! - **Router** (`router`) - ordered route table that resolves an event into outcomes
//! - **Dispatch** (`dispatch`) - per-event-type handlers, the submission guard and outcome execution
//! - **Conversation** (`conversation`) - timed multi-message sessions
//! - **Payloads** (`payload`, `cards`) - attachment and dialog builders plus the canned intro-card copy
//! - **Sink** (`sink`) - the outbound seam towards Slack
//! - **Source** (`source`) - the queue and runner that feed envelopes to the dispatcher
//!
//! # Architecture
//!
//! ```text
//! HTTP body → wire → SlackEnvelope → EventSource → EventDispatcher → Router
//!                                                        ↓
//!                                   ReplySink ← OutcomeExecutor ← Resolution
//! ```

pub mod cards;
pub mod conversation;
pub mod dispatch;
pub mod events;
pub mod payload;
pub mod router;
pub mod sink;
pub mod source;
pub mod wire;
