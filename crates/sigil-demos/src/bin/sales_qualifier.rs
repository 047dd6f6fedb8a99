// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Instruction search for a sales lead qualifier with COPRO

use clap::Parser;
use sigil::{Example, Module, Prediction, TraceEntry};
use sigil_demos::sales::{self, render_analysis, SalesQualifier, COMPLEX_EMAIL};
use sigil_demos::{init_logging, rule, DemoLM, LmArgs};
use sigil_eval::{FnMetric, MetricResult};
use sigil_optimize::COPRO;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sales_qualifier")]
#[command(about = "Optimize sales qualification instructions with COPRO", long_about = None)]
struct Cli {
    /// Optimization rounds
    #[arg(long, default_value_t = 2)]
    depth: usize,

    /// Candidate instructions per round
    #[arg(long, default_value_t = 3)]
    breadth: usize,

    /// Where to save the optimized program
    #[arg(short, long, default_value = "programs/sales_qualifier_copro.json")]
    output: PathBuf,

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

    println!("🚀 AI-Powered Sales Intelligence");
    println!("{}", rule(55));

    println!("1️⃣ Baseline sales qualification");
    println!("{}", "-".repeat(45));
    let baseline = SalesQualifier::new()?;
    let preview: String = COMPLEX_EMAIL.chars().take(100).collect();
    println!("📧 Complex Enterprise Sales Email:\n\"{preview}...\"\n");

    let baseline_pred = baseline.qualify(&ctx, COMPLEX_EMAIL).await?;
    println!("🤖 Baseline Analysis:\n{}", render_analysis(&baseline_pred));

    println!("\n2️⃣ COPRO optimization");
    println!("{}", "-".repeat(50));
    // Every candidate scores the same, so the search only exercises the proposer.
    let metric = FnMetric::new(
        "constant",
        |_: &Example, _: &Prediction, _: Option<&[TraceEntry]>| MetricResult::pass(),
    );
    let copro = COPRO::new(metric)
        .with_depth(cli.depth)
        .with_breadth(cli.breadth)
        .with_num_threads(1)
        .with_track_stats(true);
    let (optimized, stats) = copro
        .compile_with_stats(&ctx, &baseline, &sales::trainset())
        .await?;
    tracing::info!(total_calls = stats.total_calls, "COPRO finished");
    for (predictor, best) in &stats.results_best {
        println!("   {predictor}: best score per depth {best:?}");
    }

    println!("\n3️⃣ COPRO-optimized analysis");
    println!("{}", "-".repeat(50));
    for (name, predictor) in optimized.named_predictors() {
        println!("   {name} instructions: {}", predictor.signature().instructions);
    }
    let optimized_pred = optimized.qualify(&ctx, COMPLEX_EMAIL).await?;
    println!("🎯 Optimized Analysis:\n{}", render_analysis(&optimized_pred));

    println!("\n4️⃣ Strategy comparison");
    println!("{}", "-".repeat(35));
    let baseline_action = baseline_pred.get_str("next_best_action").unwrap_or_default();
    let optimized_action = optimized_pred.get_str("next_best_action").unwrap_or_default();
    println!("   Baseline: {baseline_action}");
    println!("   COPRO:    {optimized_action}");
    if optimized_action != baseline_action {
        println!("✅ COPRO produced a different sales strategy");
    }

    optimized.save(&cli.output)?;
    Ok(())
}
