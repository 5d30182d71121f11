//! CLI command implementations.
//!
//! | Module   | Commands handled        |
//! |----------|-------------------------|
//! | `verify` | `Text`, `Url`, `File`   |
//! | `config` | `Config`                |

pub mod config;
pub mod verify;

pub use config::cmd_config;
pub use verify::cmd_verify;

use claimcheck::config::CliOverrides;

use super::Cli;

/// CLI flags that override file and environment configuration.
pub fn cli_overrides(cli: &Cli) -> CliOverrides {
    CliOverrides {
        api_url: cli.api_url.clone(),
        transport: cli.transport,
    }
}
