// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Audit log backends

pub mod jsonl;

pub use jsonl::JsonlAuditLog;
