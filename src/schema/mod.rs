//! Unified health.sample.v1 schema
//!
//! This module defines the input schema for logged measurements. Events carry
//! their own unit and are normalised to base units before entering the pipeline.

mod adapter;
mod sample_event;

pub use adapter::*;
pub use sample_event::*;
