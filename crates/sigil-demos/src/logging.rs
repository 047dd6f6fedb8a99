// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Log subscriber for the demo binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Demo binaries; each is its own crate, so its events carry its name as target.
pub const BINARIES: &[&str] = &[
    "sentiment",
    "business_analysis",
    "ticket_router",
    "sales_qualifier",
    "react_qa",
    "nps_topics",
    "traditional_sentiment",
    "traditional_business",
];

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut directives = format!("warn,sigil={level}");
    for bin in BINARIES {
        directives.push_str(&format!(",{bin}={level}"));
    }
    directives
}

/// Install a compact fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}
