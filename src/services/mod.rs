//! Services shared by the library and the CLI

pub mod progress;

pub use progress::{
    create_cli_progress_reporter, ConsoleProgressReporter, NoOpProgressReporter, ProgressReporter,
};
