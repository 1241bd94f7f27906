//! Pub/sub and external queue contracts: thin traits over SNS-style
//! topics and SQS-style queues, kept separate from [`crate::primitives`]
//! because these model a different service's delivery semantics
//! (at-least-once fan-out and a managed visibility timeout we don't
//! control) rather than state this crate owns end-to-end — this tool is
//! a client of those services, not a reimplementation of them.

pub mod queue_service;
pub mod topic;

pub use queue_service::{QueueServiceContract, SqsQueueService};
pub use topic::{SnsTopicContract, TopicContract};
