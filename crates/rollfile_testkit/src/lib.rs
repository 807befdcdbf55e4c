//! # rollfile Testkit
//!
//! Test utilities for rollfile.
//!
//! This crate provides:
//! - Test fixtures: temporary log directories with a manual rotation trigger
//! - Property-based test generators using proptest
//! - Stress testing utilities for concurrent writers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rollfile_testkit::prelude::*;
//!
//! #[test]
//! fn test_rotation() {
//!     let log = TestLog::new("app");
//!     let writer = log.open(WriterMode::Lock);
//!     writer.write(b"old").unwrap();
//!     writer.rotate_to("app.log.1");
//!     writer.write(b"new").unwrap();
//!     writer.close().unwrap();
//!     assert_eq!(log.read_all(), b"oldnew");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Re-exports for convenient test imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use rollfile::{Config, RollingWriter, WriterError, WriterMode};
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
