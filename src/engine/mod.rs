// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Step execution engine
//!
//! Fingerprinting, status derivation, run dispatch, manifest persistence,
//! artifact materialization and upstream-cascading execution.

pub mod dispatch;
mod events;
mod fingerprint;
mod lookup;
mod runner;
mod scheduler;
mod status;
mod store;

pub use dispatch::{execute_run, render_template};
pub use events::{ChannelSink, EngineEvent, EventSink, TracingSink};
pub use fingerprint::{compute_fingerprint, Fingerprint};
pub use lookup::{ConfigLookup, NoConfig, StaticConfig};
pub use runner::{ProcessOutput, ProcessRunner, ShellRunner};
pub use scheduler::{StepEngine, StepEngineBuilder};
pub use status::derive_status;
pub use store::StoreLayout;
