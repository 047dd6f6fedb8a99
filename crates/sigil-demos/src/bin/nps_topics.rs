// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Multi-label NPS topic tagging against a local model

use clap::Parser;
use sigil::{ChainOfThought, Inputs, JSONAdapter, Module};
use sigil_demos::nps::{self, SAMPLE_COMMENT};
use sigil_demos::{init_logging, DemoLM, LmArgs};
use sigil_eval::ListExactMatch;
use sigil_optimize::{AutoMode, MIPROv2, Optimizer};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nps_topics")]
#[command(about = "Tag NPS comments with topics and optimize the tagger with MIPROv2", long_about = None)]
struct Cli {
    /// Labelled comments: a JSON array of {comment, topics}
    #[arg(short, long, default_value = "crates/sigil-demos/data/nps_comments.json")]
    data: PathBuf,

    /// Share of comments used for training
    #[arg(long, default_value_t = 0.5)]
    train_ratio: f64,

    /// Seed for the train/validation split
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Search budget: light, medium or heavy
    #[arg(long, default_value = "light")]
    auto: AutoMode,

    /// Parallel requests while optimizing
    #[arg(long, default_value_t = 24)]
    num_threads: usize,

    #[command(flatten)]
    lm: LmArgs,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();
    init_logging(cli.verbose);

    // Local model, uncached, unless overridden on the command line
    if cli.lm.model.is_none() {
        cli.lm.no_cache = true;
    }
    let lm_args = cli.lm.clone().or_model(
        "ollama_chat/llama3.2:1b",
        Some("http://host.docker.internal:11434"),
    );
    let demo = DemoLM::from_args(&lm_args).await?;
    let ctx = demo.settings().with_adapter(JSONAdapter::default());

    let records = nps::load_records(&cli.data)?;
    let topics: Vec<String> = nps::collect_topics(&records).into_iter().collect();
    println!("{topics:?}");

    let tagger = ChainOfThought::new(nps::topic_signature()?)?;
    let sample = Inputs::new().with("comment", SAMPLE_COMMENT);

    let response = tagger.forward(&ctx, &sample).await?;
    println!("*************** response: ********************\n{response}");
    println!("{}", ctx.inspect_history(1));

    let (trainset, valset) = nps::random_split(&records, cli.train_ratio, cli.seed);
    tracing::info!(train = trainset.len(), val = valset.len(), "split comments");

    let optimizer = MIPROv2::new(ListExactMatch::new("answer"))
        .with_auto(cli.auto)
        .with_num_threads(cli.num_threads);
    let optimized = optimizer
        .compile(&ctx, &tagger, &trainset, Some(valset.as_slice()))
        .await?;

    let response = optimized.forward(&ctx, &sample).await?;
    println!("{response}");
    println!("{}", ctx.inspect_history(1));
    Ok(())
}
