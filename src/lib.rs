//! PulseLights: an audio-reactive DMX show engine.
//!
//! The engine decides, frame by frame, what value every controllable
//! light parameter should hold, driven by live audio-analysis events.
//! It is pure computation: the driver supplies an [`events::EventMap`]
//! and a timestamp each tick, and gets back hardware-ready per-light
//! output maps. Network input, wire serialization, and device discovery
//! live outside this crate.
//!
//! Structure:
//! - [`model`] — value mappings, light types, lights, easing, color.
//! - [`engine`] — transitions, effects, programs, scenes, triggers.
//! - [`events`] — the input-boundary event/diff model.
//! - [`rig`] — the per-tick driver facade.
//! - [`demo`] — a built-in demo rig for the CLI.

pub mod demo;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod rig;

pub use error::ShowError;
