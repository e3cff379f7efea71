//! Surface-syntax front end for the `multiverse` engine, shared between the
//! `multiverse` binary and integration tests.

pub mod surface;

pub use surface::{compile, SurfaceError};
