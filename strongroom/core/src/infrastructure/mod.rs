// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure Layer
//!
//! Adapters behind the domain traits: the local filesystem
//! [`storage::LocalStorageProvider`], the JSON-lines
//! [`audit::JsonlAuditLog`] and in-memory repositories.

pub mod audit;
pub mod repositories;
pub mod storage;
