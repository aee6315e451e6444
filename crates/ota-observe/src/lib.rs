mod logger;
pub use logger::*;

pub mod console;
pub use console::Console;
