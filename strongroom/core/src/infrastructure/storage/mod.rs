// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Storage provider implementations

pub mod local;

pub use local::LocalStorageProvider;
