//! Gridwork Core -- shared building blocks for the power-distribution network.
//!
//! This crate holds the pieces every other Gridwork crate depends on:
//! identifiers, deterministic fixed-point arithmetic, and the typed event
//! bus used to publish network signals.
//!
//! # Key Types
//!
//! - [`id::NodeId`] -- generational arena key for a network node.
//! - [`id::ClassTag`] -- class label used to target modifiers.
//! - [`id::Generation`] -- monotonically increasing broadcast id.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`event::EventBus`] -- subscription-based event bus with buffered
//!   delivery and owner-scoped unsubscription.

pub mod event;
pub mod fixed;
pub mod id;
