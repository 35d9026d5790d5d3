//! Process-wide logging setup shared by the binaries.

pub mod tracing;

/// Install the JSON subscriber with the default `info` filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init("info");
}
