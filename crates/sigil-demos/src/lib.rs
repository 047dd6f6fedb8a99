// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! # Sigil Demos
//!
//! Programs and datasets behind the demo binaries in `src/bin`:
//!
//! | binary                  | what it shows                                    |
//! |-------------------------|--------------------------------------------------|
//! | `sentiment`             | a single typed prediction and its prompt         |
//! | `business_analysis`     | three chained chain-of-thought stages            |
//! | `ticket_router`         | BootstrapFewShot against a zero-shot baseline    |
//! | `sales_qualifier`       | COPRO instruction search                         |
//! | `react_qa`              | a ReAct agent with Wikipedia search and MIPROv2  |
//! | `nps_topics`            | list-of-literal outputs with the JSON adapter    |
//! | `traditional_sentiment` | the same sentiment task with a raw JSON schema   |
//! | `traditional_business`  | the business analysis as one structured call     |

#![warn(missing_docs)]

pub mod business;
pub mod logging;
pub mod lm;
pub mod nps;
pub mod sales;
pub mod structured;
pub mod tickets;

pub use business::BusinessAnalysisPipeline;
pub use lm::{DemoLM, LmArgs};
pub use logging::init_logging;
pub use sales::SalesQualifier;
pub use tickets::TicketRouter;

/// Horizontal rule used between demo sections
pub fn rule(width: usize) -> String {
    "=".repeat(width)
}
