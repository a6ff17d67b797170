//! resocket tools - main library
//!
//! Re-exports the `resocket` connection manager and the helpers shared by
//! the binaries in `src/bin/`.
//!
//! ## Architecture
//!
//! - **resocket**: reconnecting, buffering socket client (re-exported from workspace)
//! - **bin_common**: common utilities for binary executables (config path, logging)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use resocket_tools::bin_common::{init_tracing, load_socket_config};
//! use resocket_tools::resocket::ConnectionManager;
//! ```

// Re-export workspace libraries for convenience
pub use resocket;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod logging;

    pub use cli::{
        describe_config, load_config_from_env, load_socket_config, parse_args, ConfigType,
    };
    pub use logging::init_tracing;
}
