pub mod completion;
pub mod config;
pub mod detection;
pub mod error;
pub mod git;
pub mod io;
pub mod paths;
pub mod patterns;
pub mod planning;
pub mod report;
pub mod scanner;
pub mod state;
pub mod todo;
pub mod types;
pub mod walk;

pub use error::{Result, RollcallError};
