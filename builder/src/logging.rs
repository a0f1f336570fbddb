//! Development-time tracing for debugging the builder.
//!
//! Diagnostics go to stderr and are controlled by `RUST_LOG` or the CLI's
//! `-v` flag. Product output (steps, trees, mount descriptions) is printed to
//! stdout by the CLI, and user-facing notices travel through the session's
//! notice channel.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter for a `-v` count when `RUST_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "builder=info,warn",
        _ => "builder=debug,info",
    }
}

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins over `verbosity` when set.
///
/// # Example
/// ```bash
/// RUST_LOG=builder::core=debug builder apply reply.txt
/// ```
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity > 1)
                .compact(),
        )
        .init();
}
