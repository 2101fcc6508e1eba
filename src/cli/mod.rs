//! Headless driver for the navigation controller.
//!
//! The CLI wires the real generation client to a `HeadlessRuntime` and
//! replays visitor steps against it. Window events flow from the runtime
//! through a channel to the output handler, the same way a page script would
//! receive them.
//!
//! ```text
//! +----------------------+     +-----------------+     +---------------+
//! | NavigationController | --> | HeadlessRuntime | --> | output.rs     |
//! | (steps from runner)  |     | (emit())        |     | (print/JSON)  |
//! +----------------------+     +-----------------+     +---------------+
//! ```

mod args;
mod bootstrap;
mod output;
mod runner;
mod settings;

pub use args::Args;
pub use bootstrap::{initialize, CliContext};
pub use output::{run_event_loop, write_document, StepResult};
pub use runner::{execute_batch, execute_once, Step};
pub use settings::run_settings_command;
