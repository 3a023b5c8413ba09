//! Generation service contract
//!
//! Answer generation is an external collaborator: the pipeline hands it a list of
//! messages and consumes a finite, non-restartable stream of text fragments.
//! Dropping the stream is the only cancellation there is.

pub mod message;
pub mod provider;
pub mod streaming;

pub use message::{Message, Role};
pub use provider::Provider;
pub use streaming::{AnswerChunk, AnswerStream, BoxAnswerStream, ScriptedStream};
