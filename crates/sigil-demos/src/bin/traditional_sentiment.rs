// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Sentiment through a single JSON-schema constrained completion

use clap::Parser;
use sigil_demos::structured::classify_sentiment;
use sigil_demos::{init_logging, DemoLM, LmArgs};

#[derive(Parser)]
#[command(name = "traditional_sentiment")]
#[command(about = "Score sentiment with a raw structured-output call", long_about = None)]
struct Cli {
    /// Text to classify
    #[arg(short, long, default_value = "I am feeling pretty happy!")]
    text: String,

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
    let reply = classify_sentiment(demo.lm().as_ref(), &cli.text).await?;

    println!("The sentiment is: {}", reply.sentiment);
    Ok(())
}
