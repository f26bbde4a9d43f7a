//! Reusable test suites, exposed to other crates via the `tests` feature

pub mod store;
