//! # class-metrics
//!
//! Decodes compiled Java classes and scores the dependency health of the
//! packages, components and groups they form.
//!
//! ## Architecture
//!
//! - **reader**: Big-endian cursor over class-file bytes and modified UTF-8
//! - **constant_pool**: Constant pool table with two-slot long/double entries
//! - **descriptor**: Field and method descriptor grammar
//! - **classfile**: Class-file decoder producing immutable `ClassDescriptor`s
//! - **dependency**: Dependency-type bitmask lattice and query granularities
//! - **model**: Package, component and group builders and their frozen forms
//! - **metrics**: Martin metrics and DIP/SDP/ADP/SAP checks
//! - **engine**: Lifts class edges to any level and scores families in parallel
//! - **scan**: Classpath root discovery and Maven repository layout
//! - **source**: Class bytes from class files and jars
//! - **classpath**: Project roots by component role
//! - **load**: Root-to-group loading with per-entry failure isolation
//! - **report**: JSON and text analysis reports
//! - **config**: TOML configuration and CLI/env/default resolution

pub mod classfile;
pub mod classpath;
pub mod cli;
pub mod config;
pub mod constant_pool;
pub mod dependency;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod load;
pub mod metrics;
pub mod model;
pub mod reader;
pub mod report;
pub mod scan;
pub mod source;

#[cfg(test)]
#[path = "../tests/support/class_builder.rs"]
mod class_builder;
