// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Business analysis as one structured completion

use clap::Parser;
use sigil_demos::structured::{analyze_business, BUSINESS_BRIEF};
use sigil_demos::{init_logging, rule, DemoLM, LmArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "traditional_business")]
#[command(about = "Market, customer and strategy analysis in a single call", long_about = None)]
struct Cli {
    /// Read the opportunity brief from this file instead of the built-in one
    #[arg(short, long)]
    brief: Option<PathBuf>,

    #[command(flatten)]
    lm: LmArgs,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let brief = match &cli.brief {
        Some(path) => std::fs::read_to_string(path)?,
        None => BUSINESS_BRIEF.to_string(),
    };

    let demo = DemoLM::from_args(&cli.lm).await?;
    let analysis = analyze_business(demo.lm().as_ref(), &brief).await?;

    println!("{}", rule(50));
    println!("Market Analysis: {}", analysis.market_analysis);
    println!("Customer Analysis: {}", analysis.customer_analysis);
    println!("Strategic Recommendations: {}", analysis.strategic_recommendations);
    Ok(())
}
