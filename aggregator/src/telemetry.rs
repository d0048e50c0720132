//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// arkworks instruments every gadget call on the `r1cs` target at INFO. Recording those
/// spans while synthesizing a circuit exhausts memory, so they are always off.
const R1CS_SPANS: &str = "r1cs=off";

/// `RUST_LOG`, defaulting to `info`, with arkworks' constraint spans disabled.
pub fn env_filter() -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match R1CS_SPANS.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Install the fmt subscriber filtered by [`env_filter`].
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter()).try_init();
}
