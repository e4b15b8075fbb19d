//! Test harness for CLI integration tests.
//!
//! Provides isolated test environments, programmatic library snapshots,
//! and CLI assertion helpers using `assert_cmd`.

mod command;
mod env;
mod library;

// Re-export main types for external use
#[allow(unused_imports)]
pub use command::MdnotesCommand;
#[allow(unused_imports)]
pub use env::TestEnv;
#[allow(unused_imports)]
pub use library::TestLibrary;
