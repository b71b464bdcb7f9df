//! # marshal
//!
//! Library half of the Marshal binary: turning a schema file and a row file
//! into a wired [`marshal_core::Manager`].

pub mod loader;
