//! Shared configuration knobs for the `mkfs` and `fsdebug` binaries.
//!
//! There is no on-disk or file-based configuration: this crate's only
//! inputs are the backing file path, the block count, and verbosity, all
//! supplied on the command line (Non-goals exclude filenames and
//! namespaces, so there is nothing else to configure).

/// Initialize `env_logger` at `Info` level, or `Debug` when `verbose` is set.
///
/// Debug-level call sites only exist when the crate is built with the
/// `debug_log` feature; this controls the runtime filter on top of that
/// build-time switch.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new().filter_level(level).init();
}
