use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("pipeline is closed")]
    Closed,

    #[error("queue still full after {0:?}")]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote api error: {0}")]
    Remote(String),

    #[error("remote api returned no reply")]
    EmptyReply,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown bot '{0}'")]
pub struct UnknownBot(pub String);
