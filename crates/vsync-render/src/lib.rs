//! Headless rendering layer
//!
//! This crate provides an in-memory implementation of the
//! [`RenderingLayer`](vsync_core::RenderingLayer) contract: viewports hold a
//! camera and per-volume display properties, every state write emits a
//! change notification, and tool gestures (pan, zoom, rotate,
//! window/level, colormap) are emulated so synchronization can be driven
//! without a GPU.

mod headless;
mod tools;


pub use headless::{HeadlessRenderer, ViewportCounters};
pub use tools::{MIN_PARALLEL_SCALE, MIN_WINDOW_WIDTH};
