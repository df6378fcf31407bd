//! Fan-out of processed frames to live observers.
//!
//! Each observer owns a bounded queue. `broadcast` serializes the frame once
//! and offers the shared payload to every queue without waiting; an observer
//! whose queue is closed or full is dropped on the spot, so one stuck client
//! cannot hold back detection processing for the others.

pub mod hub;

pub use hub::{BroadcastHub, BroadcastOutcome, ObserverId, ObserverReceiver, DEFAULT_OBSERVER_QUEUE};
