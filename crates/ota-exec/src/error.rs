use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("concurrency cap must be a positive integer")]
    InvalidCapacity,
    #[error("runner already has a batch in flight")]
    AlreadyRunning,
    #[error("unit of work faulted: {0}")]
    WorkerFault(String),
}

pub type ExecResult<T> = Result<T, ExecError>;
