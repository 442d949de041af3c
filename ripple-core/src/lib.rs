//! Ripple Core
//!
//! This crate provides a fine-grained reactive dependency-tracking engine.
//! It implements:
//!
//! - Observed records and lists whose reads and writes are intercepted
//! - Automatic dependency tracking for reactions
//! - Immediate, synchronous change propagation
//! - Lazy or eager deep observation of nested structures
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: the runtime, reactions, dependency registry and execution stack
//! - `observe`: containers, values, observed handles and their typed views
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, atomic::{AtomicI64, Ordering}};
//! use ripple_core::{Runtime, Value};
//!
//! let runtime = Runtime::new();
//! let data = runtime
//!     .observe(Value::record([("price", 10), ("count", 2)]))
//!     .into_observed()
//!     .unwrap()
//!     .record()
//!     .unwrap();
//!
//! let total = Arc::new(AtomicI64::new(0));
//! let (reader, out) = (data.clone(), total.clone());
//! runtime.run_reaction(move || {
//!     let price = reader.get("price").and_then(|v| v.as_int()).unwrap_or(0);
//!     let count = reader.get("count").and_then(|v| v.as_int()).unwrap_or(0);
//!     out.store(price * count, Ordering::SeqCst);
//! });
//! assert_eq!(total.load(Ordering::SeqCst), 20);
//!
//! // The reaction re-runs before `set` returns.
//! data.set("price", 20);
//! assert_eq!(total.load(Ordering::SeqCst), 40);
//! ```

pub mod config;
mod error;
pub mod observe;
pub mod reactive;

pub use config::{ObservationMode, RuntimeConfig};
pub use error::{Error, Result};
pub use observe::{Container, ContainerId, ContainerKind, Observed, ObservedList, ObservedRecord, Value};
pub use reactive::{Dependency, Key, Reaction, ReactionId, Runtime};
