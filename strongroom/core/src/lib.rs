// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Strongroom Core
//!
//! Scoped file access for agents and teams sharing one hierarchical store.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Access decisions, storage enforcement, quota tracking and the
//!   append-only audit trail

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod metrics;

pub use domain::*;
