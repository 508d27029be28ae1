//! Plexus Test - shared test doubles for the resolver runtime.
//!
//! In-memory implementations of every host collaborator, plus a
//! [`TestRuntime`] that wires them together.
//!
//! ```toml
//! [dev-dependencies]
//! plexus-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use plexus_test::{TestRuntime, graph_from_toml};
//!
//! let env = TestRuntime::new(graph_from_toml(GRAPH));
//! env.add_class("org.c", "classes/", "com.c.Widget", b"widget");
//! let artifact = env.resolver("org.a").resolve("com.c.Widget").unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
