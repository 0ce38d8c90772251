//! Layout dump utility
//! Parses a layout definition, optionally loads a raw image into it and
//! prints the field table with a hex dump of the buffer

use memstruct::{load_definition, load_image, Layout, LayoutConfig};
use std::env;
use std::fs;
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;

    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!(
            "Usage: {} <definition> (<config.json> | <width> <ordering> <padding>) [image.bin]",
            args[0]
        );
        eprintln!("\nExamples:");
        eprintln!("  {} header.def layout.json", args[0]);
        eprintln!("  {} header.def 32 little int dump.bin", args[0]);
        std::process::exit(1);
    }

    let (config, image) = if args[2].ends_with(".json") {
        let json = fs::read_to_string(&args[2])?;
        (LayoutConfig::from_json(&json)?, args.get(3))
    } else {
        if args.len() < 5 {
            anyhow::bail!("expected <width> <ordering> <padding> after the definition");
        }
        let config = LayoutConfig::new(args[2].parse()?, args[3].parse()?, args[4].parse()?);
        (config, args.get(5))
    };

    tracing::info!("Definition: {}", args[1]);
    tracing::info!("Config: {:?}", config);

    let definition = load_definition(&args[1])?;
    let mut layout = Layout::from_config(&definition, &config)?;

    if let Some(image) = image {
        let copied = load_image(image, &mut layout)?;
        tracing::info!("Loaded {} bytes from {}", copied, image);
    }

    println!("=== Fields ({} bytes) ===\n", layout.size_of());
    print!("{}", layout);

    println!("\n=== Buffer ===\n");
    print!("{}", layout.hexdump());

    Ok(())
}
