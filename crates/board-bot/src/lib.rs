//! Background reply pipeline: the broadcaster fans stored messages out to bots,
//! bots run their processor, and the poster stores and re-broadcasts replies.

pub mod bot;
pub mod broadcast;
pub mod client;
pub mod error;
pub mod poster;
pub mod processor;

pub use error::{DispatchError, ProcessError, UnknownBot};
