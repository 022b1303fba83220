//! Persistence gateway and messenger.
//!
//! `DocumentStore` is the opaque document store every stateful component
//! sits on top of: named collections of JSON documents, addressable by id,
//! with an atomic conditional-update primitive strong enough to implement a
//! compare-and-set lease (see [`ConditionSpec`]). `Messenger` is the
//! in-process pub/sub used to wake a sleeping queue scanner.

pub mod condition;
pub mod memory_store;
pub mod messenger;
pub mod store;

pub use condition::ConditionSpec;
pub use messenger::Messenger;
pub use store::{DocumentStore, StoreError};
