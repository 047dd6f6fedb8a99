// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Wikipedia question answering with a ReAct agent, optimized by MIPROv2

use clap::Parser;
use sigil::{ColBERTv2, Example, Module, ReAct, Signature, Tool};
use sigil_demos::{init_logging, DemoLM, LmArgs};
use sigil_eval::{AnswerExactMatch, Evaluate};
use sigil_optimize::{AutoMode, MIPROv2};
use std::path::PathBuf;
use std::sync::Arc;

const WIKI_ABSTRACTS: &str = "http://20.102.90.50:2017/wiki17_abstracts";

#[derive(Parser)]
#[command(name = "react_qa")]
#[command(about = "Optimize a search-augmented ReAct agent with MIPROv2", long_about = None)]
struct Cli {
    /// Training questions, one JSON object per line
    #[arg(long, default_value = "crates/sigil-demos/data/trainset.jsonl")]
    trainset: PathBuf,

    /// Validation questions, one JSON object per line
    #[arg(long, default_value = "crates/sigil-demos/data/valset.jsonl")]
    valset: PathBuf,

    /// ColBERTv2 endpoint
    #[arg(long, default_value = WIKI_ABSTRACTS)]
    colbert_url: String,

    /// Passages per search
    #[arg(short, long, default_value_t = 3)]
    k: usize,

    /// Agent steps before answering
    #[arg(long, default_value_t = 10)]
    max_iters: usize,

    /// Search budget: light, medium or heavy
    #[arg(long, default_value = "light")]
    auto: AutoMode,

    /// Parallel requests while optimizing
    #[arg(long, default_value_t = 16)]
    num_threads: usize,

    /// Parallel requests while evaluating
    #[arg(long, default_value_t = 24)]
    eval_threads: usize,

    /// Warm the response cache from this file and write it back at the end
    #[arg(long)]
    memory_cache: Option<PathBuf>,

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

    let search: Arc<dyn Tool> = Arc::new(ColBERTv2::new(&cli.colbert_url).search_tool(cli.k));
    let react =
        ReAct::new(Signature::parse("question -> answer")?, vec![search])?.with_max_iters(cli.max_iters);

    let trainset = Example::load_jsonl(&cli.trainset, ["question"])?;
    let valset = Example::load_jsonl(&cli.valset, ["question"])?;
    if let Some(first) = trainset.first() {
        println!("{}", serde_json::to_string(first.data())?);
    }

    if let Some(path) = &cli.memory_cache {
        match demo.memory_cache() {
            Some(cache) if path.exists() => {
                let loaded = cache.load(path).await?;
                tracing::info!(entries = loaded, path = %path.display(), "memory cache warmed");
            }
            Some(_) => tracing::info!(path = %path.display(), "no memory cache file yet"),
            None => tracing::warn!("--memory-cache ignored with --cache-dir"),
        }
    }

    let optimizer = MIPROv2::new(AnswerExactMatch::default())
        .with_auto(cli.auto)
        .with_num_threads(cli.num_threads);
    let (optimized_react, report) = optimizer
        .compile_with_report(&ctx, &react, &trainset, Some(valset.as_slice()))
        .await?;
    tracing::info!(
        trials = report.trials.len(),
        best_score = report.best_score,
        "MIPROv2 finished"
    );

    for (name, predictor) in optimized_react.named_predictors() {
        println!("{name}: {}", predictor.signature().instructions);
        println!("{name}: {} demos", predictor.demos().len());
    }

    let evaluator = Evaluate::new(valset.clone(), AnswerExactMatch::default())
        .with_display_table(valset.len())
        .with_display_progress(true)
        .with_num_threads(cli.eval_threads);
    let original = evaluator.run(&ctx, &react).await?;
    println!("Original score: {}", original.percentage());

    let optimized = evaluator.run(&ctx, &optimized_react).await?;
    println!("Optimized score: {}", optimized.percentage());

    if let (Some(path), Some(cache)) = (&cli.memory_cache, demo.memory_cache()) {
        cache.save(path).await?;
    }
    Ok(())
}
