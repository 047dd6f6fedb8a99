// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Three chained chain-of-thought stages over a business opportunity

use clap::Parser;
use sigil_demos::{init_logging, BusinessAnalysisPipeline, DemoLM, LmArgs};

#[derive(Parser)]
#[command(name = "business_analysis")]
#[command(about = "Market, customer and strategy analysis as a multi-stage program", long_about = None)]
struct Cli {
    /// Business topic
    #[arg(long, default_value = "AI-powered customer support tool")]
    topic: String,

    /// Market information
    #[arg(
        long,
        default_value = "Market growing at 25% annually, current size $2B, competitors: Zendesk, Intercom"
    )]
    market_data: String,

    /// Customer feedback
    #[arg(
        long,
        default_value = "Users want faster response times, hate repetitive queries, willing to pay premium"
    )]
    customer_feedback: String,

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

    let demo = DemoLM::from_args(&cli.lm).await?;
    let ctx = demo.settings();

    let pipeline = BusinessAnalysisPipeline::new()?;
    let result = pipeline
        .analyze(&ctx, &cli.topic, &cli.market_data, &cli.customer_feedback)
        .await?;

    let market = result.nested("market_analysis")?;
    let customers = result.nested("customer_analysis")?;
    let strategy = result.nested("recommendations")?;

    println!(
        "Market Size: {}",
        market.get_str("market_size").unwrap_or_default()
    );
    println!(
        "Pain Points: {:?}",
        customers.get_list("pain_points").unwrap_or_default()
    );
    println!(
        "Recommendations: {:?}",
        strategy.get_list("recommendations").unwrap_or_default()
    );
    if let Some(usage) = result.usage {
        tracing::info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "pipeline finished"
        );
    }
    Ok(())
}
