// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Layer
//!
//! Wires configuration to concrete infrastructure and hands back a ready
//! [`crate::domain::fsal::StorageEnforcementLayer`].

pub mod store_factory;
