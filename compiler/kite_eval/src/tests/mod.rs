//! Operator test modules.
//!
//! Kept out of the implementation files to keep those readable.

mod operators_tests;
