use chatweave::export::Exporter;
use chatweave::model::Flow;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Compiles a multi-agent flow description into a runnable ag2 program
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the flow JSON file
    flow_path: PathBuf,

    /// Directory the program is written to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Write argument types as `# type:` comments instead of annotations
    #[arg(long)]
    types_as_comments: bool,

    /// Drop the `cache_seed` key from every llm_config
    #[arg(long)]
    no_cache_seed: bool,

    /// Print the program to stdout instead of writing files
    #[arg(long)]
    stdout: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    let json = fs::read_to_string(&cli.flow_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read flow file '{}': {}",
            cli.flow_path.display(),
            e
        ))
    });
    let flow = Flow::from_json(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid flow:\n{}", e)));

    let mut builder = Exporter::builder(&flow)
        .with_types_as_comments(cli.types_as_comments)
        .with_skip_aux_files(cli.stdout);
    if cli.no_cache_seed {
        builder = builder.with_cache_seed(None);
    }
    let output = builder
        .build()
        .export()
        .unwrap_or_else(|e| exit_with_error(&format!("Export failed: {}", e)));

    if cli.stdout {
        print!("{}", output.program);
        return;
    }

    let path = output
        .write_to(&cli.output)
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    eprintln!(
        "Exported '{}' to {} in {:?}",
        flow.name,
        path.display(),
        start.elapsed()
    );
    for (name, _) in &output.aux_files {
        eprintln!("  + {}", cli.output.join(name).display());
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
