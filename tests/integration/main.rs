//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no IR blaster,
//! thermometer or broker required.

mod mock_hw;
mod reconciler_tests;
mod store_tests;
