//! AtlasShift core library: invariant mining, transformations, planning,
//! recipes and the asynchronous job runner.
//!
//! The usual entry points are [`recipe::RecipeEngine`] for synchronous plan
//! generation and [`job::JobRunner`] for tracked, cancellable execution.

pub mod config;
pub mod contracts;
pub mod error;
pub mod invariant;
pub mod job;
pub mod planner;
pub mod progress;
pub mod recipe;
pub mod transform;
