mod error;
pub use error::{ExecError, ExecResult};

pub mod pool;
pub use pool::{PoolRunner, ResultStream};

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::pool::{PoolRunner, ResultStream};
}
