//! tracing subscriber setup for the binary.
//!
//! Lines go to stderr without timestamps; each one carries the `lockmerge`
//! root span as its prefix so driver output is easy to grep in git's merge
//! report.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::cli::AppContext;

/// Filter directives are read from this variable, e.g. `LOCKMERGE_LOG=debug`
pub const LOG_ENV: &str = "LOCKMERGE_LOG";

/// Default directive when `LOCKMERGE_LOG` is unset
pub fn default_directive(ctx: &AppContext) -> &'static str {
    if ctx.quiet { "warn" } else { "info" }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(ctx: &AppContext) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(ctx)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!ctx.no_color)
        .with_target(false)
        .with_level(true)
        .without_time()
        .with_span_events(FmtSpan::NONE)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_lowers_default_level() {
        let loud = AppContext { quiet: false, no_color: true };
        let quiet = AppContext { quiet: true, no_color: true };
        assert_eq!(default_directive(&loud), "info");
        assert_eq!(default_directive(&quiet), "warn");
    }

    #[test]
    fn init_twice_does_not_panic() {
        let ctx = AppContext { quiet: true, no_color: true };
        init(&ctx);
        init(&ctx);
    }
}
