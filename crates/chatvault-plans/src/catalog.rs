// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The static two-tier plan catalog.

use chatvault_core::types::PlanTier;

/// Commercial terms of one tier.
#[derive(Debug, Clone, Copy)]
pub struct PlanSpec {
    pub tier: PlanTier,
    pub name: &'static str,
    pub price_monthly: f64,
    /// Messages per billing period; `None` means unlimited.
    pub max_messages: Option<u32>,
    /// Default scheduled backup cadence.
    pub backup_frequency_hours: u32,
    pub features: &'static [&'static str],
}

const CATALOG: [PlanSpec; 2] = [
    PlanSpec {
        tier: PlanTier::Express,
        name: "Express",
        price_monthly: 18.0,
        max_messages: Some(5000),
        backup_frequency_hours: 12,
        features: &[
            "QR-linked personal account backups",
            "12-hour automatic backup cadence",
            "5,000 messages per month",
            "Full-text message search",
        ],
    },
    PlanSpec {
        tier: PlanTier::Pro,
        name: "Pro",
        price_monthly: 35.0,
        max_messages: None,
        backup_frequency_hours: 24,
        features: &[
            "Official WhatsApp Business API backups",
            "Unlimited messages",
            "Daily automatic backups",
            "Full-text message search",
            "Priority support",
        ],
    },
];

/// All offered plans, cheapest first.
pub fn plan_catalog() -> &'static [PlanSpec] {
    &CATALOG
}

/// The catalog entry for a tier.
pub fn plan_for(tier: PlanTier) -> &'static PlanSpec {
    match tier {
        PlanTier::Express => &CATALOG[0],
        PlanTier::Pro => &CATALOG[1],
    }
}
