// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Pure types and rules for workspace access. Nothing in here touches the
//! filesystem directly; disk access goes through [`storage::StorageProvider`].
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Entities, value objects and collaborator traits

pub mod actor;
pub mod workspace;
pub mod access;
pub mod path_sanitizer;
pub mod storage;
pub mod quota;
pub mod audit;
pub mod repository;
pub mod config;
pub mod fsal;
