use thiserror::Error;

use crate::pipeline::role::Role;

pub type Result<T> = std::result::Result<T, Error>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("operation cancelled")]
    Cancelled,

    #[error("buffer closed to new items")]
    Closed,

    #[error("{role} #{index} faulted: {source}")]
    Participant {
        role: Role,
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid configuration: {context}")]
    Config { context: &'static str },

    #[error("pipeline error: {context}")]
    Pipeline { context: &'static str },

    #[error(transparent)]
    Custom(BoxError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn pipeline(context: &'static str) -> Self {
        Self::Pipeline { context }
    }

    pub fn config(context: &'static str) -> Self {
        Self::Config { context }
    }

    pub fn custom(error: impl Into<BoxError>) -> Self {
        Self::Custom(error.into())
    }

    pub(crate) fn participant(role: Role, index: usize, source: Error) -> Self {
        Self::Participant {
            role,
            index,
            source: Box::new(source),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The error a participant originally raised, with runner context peeled off.
    pub fn root(&self) -> &Error {
        match self {
            Self::Participant { source, .. } => source.root(),
            other => other,
        }
    }
}
