// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Counters recorded by the enforcement layer.
//!
//! Only the `metrics` facade is used here. Whoever embeds the crate decides
//! whether to install a recorder; without one the calls are no-ops.

use metrics::{counter, describe_counter};

pub const ACCESS_DECISIONS: &str = "strongroom_access_decisions_total";
pub const QUOTA_WARNINGS: &str = "strongroom_quota_warnings_total";
pub const AUDIT_WRITE_FAILURES: &str = "strongroom_audit_write_failures_total";

/// Register descriptions with the installed recorder
pub fn describe() {
    describe_counter!(
        ACCESS_DECISIONS,
        "Access decisions by outcome (allow or deny)"
    );
    describe_counter!(
        QUOTA_WARNINGS,
        "Writes that crossed a workspace soft quota ceiling"
    );
    describe_counter!(
        AUDIT_WRITE_FAILURES,
        "Audit entries that could not be persisted"
    );
}

pub fn record_decision(allowed: bool) {
    let outcome = if allowed { "allow" } else { "deny" };
    counter!(ACCESS_DECISIONS, "outcome" => outcome).increment(1);
}

pub fn record_quota_warning() {
    counter!(QUOTA_WARNINGS).increment(1);
}

pub fn record_audit_failure() {
    counter!(AUDIT_WRITE_FAILURES).increment(1);
}
