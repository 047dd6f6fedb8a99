// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Classify the sentiment of one text and show the prompt behind it

use clap::Parser;
use sigil::{FieldKind, InputField, Inputs, Module, OutputField, Predict, SignatureBuilder};
use sigil_demos::{init_logging, rule, DemoLM, LmArgs};

#[derive(Parser)]
#[command(name = "sentiment")]
#[command(about = "Score the sentiment of a text from 0 to 10", long_about = None)]
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
    let ctx = demo.settings();

    let signature = SignatureBuilder::new("SentimentClassifier")
        .instructions("Classify the sentiment of a text.")
        .input(InputField::create("text", "input text to classify sentiment"))?
        .output(
            OutputField::create("sentiment", "sentiment, the higher the more positive")
                .with_kind(FieldKind::int_range(0, 10)),
        )?
        .build()?;
    let predict = Predict::new(signature);

    let output = predict
        .forward(&ctx, &Inputs::new().with("text", cli.text.as_str()))
        .await?;

    let sentiment = output
        .get_i64("sentiment")
        .ok_or_else(|| anyhow::anyhow!("no sentiment in {output}"))?;
    println!("The sentiment is: {sentiment}");
    println!("{}", rule(50));
    println!("{}", ctx.inspect_history(1));
    Ok(())
}
