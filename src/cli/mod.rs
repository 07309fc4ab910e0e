//! # CLI Module
//!
//! Command-line interface of the `sprig` binary, which runs the
//! [`crate::demo`] application.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! sprig serve --port 8080 --static-dir ./public --token s3cret
//! ```
//!
//! Settings are layered: the YAML file given with `--config`, then
//! `SPRIG_*` environment variables, then flags.
//!
//! ### `routes`
//!
//! Print the registered routes in registration order:
//!
//! ```bash
//! sprig routes
//! ```

mod commands;


pub use commands::{run_cli, Cli, Commands, ServeArgs};
