// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Zero-shot versus bootstrapped few-shot ticket routing

use clap::Parser;
use sigil::{Module, Settings};
use sigil_demos::tickets::{
    self, team_breakdown, BusinessCriticalMatch, TeamWiseAccuracy, TicketRouter,
};
use sigil_demos::{init_logging, rule, DemoLM, LmArgs};
use sigil_eval::{Evaluate, EvaluationResult, Metric};
use sigil_optimize::{BootstrapFewShot, Optimizer};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ticket_router")]
#[command(about = "Optimize a support ticket router with BootstrapFewShot", long_about = None)]
struct Cli {
    /// Parallel evaluation requests
    #[arg(short = 'j', long, default_value_t = 4)]
    num_threads: usize,

    /// Bootstrapped demos per predictor
    #[arg(long, default_value_t = 5)]
    max_bootstrapped_demos: usize,

    /// Bootstrapping rounds
    #[arg(long, default_value_t = 2)]
    max_rounds: usize,

    /// Directory for the saved programs
    #[arg(short, long, default_value = "programs")]
    out_dir: PathBuf,

    #[command(flatten)]
    lm: LmArgs,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

async fn evaluate(
    ctx: &Settings,
    program: &TicketRouter,
    metric: Arc<dyn Metric>,
    num_threads: usize,
    display_progress: bool,
) -> anyhow::Result<EvaluationResult> {
    let result = Evaluate::from_arc(tickets::testset(), metric)
        .with_num_threads(num_threads)
        .with_display_progress(display_progress)
        .run(ctx, program)
        .await?;
    Ok(result)
}

fn print_breakdown(label: &str, result: &EvaluationResult) {
    let counts = team_breakdown(
        result
            .results
            .iter()
            .map(|r| r.result.details.as_deref().unwrap_or("wrong")),
    );
    let summary = counts
        .iter()
        .map(|(team, n)| format!("{team}={n}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("• {label}: {summary}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let demo = DemoLM::from_args(&cli.lm).await?;
    let ctx = demo.settings();
    let exact_match: Arc<dyn Metric> = Arc::new(tickets::exact_match());

    println!("🚀 Optimization Demo: Ticket Routing System");
    println!("{}", rule(50));

    println!("\n1️⃣ BASELINE EVALUATION (Zero-Shot):");
    let baseline_router = TicketRouter::new()?;
    let baseline = evaluate(&ctx, &baseline_router, exact_match.clone(), cli.num_threads, true).await?;
    println!("📊 Baseline Exact Match Accuracy: {}", baseline.percentage());

    println!("{}", rule(40));
    println!("2️⃣ OPTIMIZING with BootstrapFewShot...");
    let teleprompter = BootstrapFewShot::from_arc(exact_match.clone())
        .with_max_bootstrapped_demos(cli.max_bootstrapped_demos)
        .with_max_rounds(cli.max_rounds);
    let optimized_router = teleprompter
        .compile(&ctx, &TicketRouter::new()?, &tickets::trainset(), None)
        .await?;

    println!("3️⃣ OPTIMIZED - Few-Shot Performance:");
    let optimized = evaluate(&ctx, &optimized_router, exact_match.clone(), cli.num_threads, true).await?;
    println!("📊 Optimized Exact Match Accuracy: {}", optimized.percentage());

    println!("{}", rule(40));
    println!("\n4️⃣ COMPREHENSIVE COMPARISON METRICS");
    let metrics: [(&str, Arc<dyn Metric>); 2] = [
        ("Exact Match", exact_match),
        ("Business Critical (Urgent Caught)", Arc::new(BusinessCriticalMatch)),
    ];

    let mut comparison = Vec::with_capacity(metrics.len());
    for (name, metric) in metrics {
        println!("\n📈 Evaluating: {name}");
        let base = evaluate(&ctx, &baseline_router, metric.clone(), cli.num_threads, false).await?;
        let opt = evaluate(&ctx, &optimized_router, metric, cli.num_threads, false).await?;
        comparison.push((name, base.percentage(), opt.percentage()));
    }

    println!("\n✅ Summary of Results:");
    for (name, base, opt) in &comparison {
        println!(
            "• {name}: Baseline = {base}, Optimized = {opt}, Improvement = {:.2}",
            opt - base
        );
    }

    println!("\n🔎 Correct routes per team:");
    let team_wise: Arc<dyn Metric> = Arc::new(TeamWiseAccuracy);
    let base = evaluate(&ctx, &baseline_router, team_wise.clone(), cli.num_threads, false).await?;
    let opt = evaluate(&ctx, &optimized_router, team_wise, cli.num_threads, false).await?;
    print_breakdown("Baseline", &base);
    print_breakdown("Optimized", &opt);

    baseline_router.save(&cli.out_dir.join("baseline_ticket_router.json"))?;
    optimized_router.save(&cli.out_dir.join("optimized_ticket_router.json"))?;
    Ok(())
}
