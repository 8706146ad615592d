//! History store and delta engine.
//!
//! `BenchmarkHistory` owns the append-only snapshot list; the delta engine is
//! implemented on the same type so matching always sees the store's order.

pub mod delta;
pub mod store;

pub use store::BenchmarkHistory;
