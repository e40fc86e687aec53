//! Background Tasks Module
//!
//! Periodic maintenance running alongside the pipeline.
//!
//! # Tasks
//! - Expiry sweep: releases memory held by expired in-process cache entries

mod sweep;

pub use sweep::spawn_sweep_task;
