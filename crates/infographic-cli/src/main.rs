use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use infographic_contracts::data_uri::{bytes_data_uri, decode_data_uri, DEFAULT_IMAGE_MIME};
use infographic_contracts::events::EventWriter;
use infographic_contracts::prompts::{ComplexityLevel, VisualStyle};
use infographic_contracts::research::ResearchResult;
use infographic_engine::InfographicEngine;

#[derive(Debug, Parser)]
#[command(
    name = "infographic",
    version,
    about = "Research a topic and render it as an infographic"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Append JSONL pipeline events to this file.
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[arg(long, global = true)]
    research_model: Option<String>,
    #[arg(long, global = true)]
    image_model: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Research(ResearchArgs),
    Generate(GenerateArgs),
    Edit(EditArgs),
    Fix(FixArgs),
}

#[derive(Debug, Parser)]
struct ResearchArgs {
    #[arg(long)]
    topic: String,
    #[arg(long, default_value = "High School")]
    level: String,
    #[arg(long, default_value = "Minimalist")]
    style: String,
    #[arg(long, default_value = "English")]
    language: String,
    /// Write the result JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long, conflicts_with = "prompt_from", required_unless_present = "prompt_from")]
    prompt: Option<String>,
    /// Take `imagePrompt` from a saved research result.
    #[arg(long)]
    prompt_from: Option<PathBuf>,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct EditArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    instruction: String,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Parser)]
struct FixArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    correction: String,
    #[arg(long)]
    out: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("infographic error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let engine = build_engine(&cli.common)?;
    match cli.command {
        Command::Research(args) => run_research(&engine, args),
        Command::Generate(args) => run_generate(&engine, args),
        Command::Edit(args) => run_edit(&engine, args),
        Command::Fix(args) => run_fix(&engine, args),
    }
}

fn build_engine(common: &CommonArgs) -> Result<InfographicEngine> {
    let mut engine = InfographicEngine::from_env()?;
    if common.research_model.is_some() || common.image_model.is_some() {
        let research = common
            .research_model
            .clone()
            .unwrap_or_else(|| engine.research_model().to_string());
        let image = common
            .image_model
            .clone()
            .unwrap_or_else(|| engine.image_model().to_string());
        engine.set_models(Some(research.as_str()), Some(image.as_str()))?;
    }
    if let Some(path) = common.events.as_ref() {
        let events = EventWriter::with_generated_run_id(path);
        log::info!("recording events for {} in {}", events.run_id(), path.display());
        engine = engine.with_events(events);
    }
    Ok(engine)
}

fn run_research(engine: &InfographicEngine, args: ResearchArgs) -> Result<i32> {
    let level = ComplexityLevel::parse(&args.level);
    let style = VisualStyle::parse(&args.style);
    if !level.is_known() {
        log::warn!("unknown level {:?}; using general audience guidance", args.level);
    }
    if !style.is_known() {
        log::warn!("unknown style {:?}; using default visual guidance", args.style);
    }
    let result = engine.research_topic_for_prompt(&args.topic, &level, &style, &args.language)?;
    let rendered = serde_json::to_string_pretty(&result)?;
    match args.out {
        Some(path) => {
            write_file(&path, rendered.as_bytes())?;
            println!(
                "Wrote {} facts and {} sources to {}",
                result.facts.len(),
                result.search_results.len(),
                path.display()
            );
        }
        None => println!("{rendered}"),
    }
    Ok(0)
}

fn run_generate(engine: &InfographicEngine, args: GenerateArgs) -> Result<i32> {
    let prompt = match (args.prompt, args.prompt_from) {
        (Some(prompt), _) => prompt,
        (None, Some(path)) => read_research_result(&path)?.image_prompt,
        (None, None) => bail!("--prompt or --prompt-from is required"),
    };
    let image = engine.generate_infographic_image(&prompt)?;
    write_image(&args.out, &image)?;
    Ok(0)
}

fn run_edit(engine: &InfographicEngine, args: EditArgs) -> Result<i32> {
    let source = read_image_data_uri(&args.image)?;
    let image = engine.edit_infographic_image(&source, &args.instruction)?;
    write_image(&args.out, &image)?;
    Ok(0)
}

fn run_fix(engine: &InfographicEngine, args: FixArgs) -> Result<i32> {
    let source = read_image_data_uri(&args.image)?;
    let image = engine.fix_infographic_image(&source, &args.correction)?;
    write_image(&args.out, &image)?;
    Ok(0)
}

fn read_research_result(path: &Path) -> Result<ResearchResult> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a research result", path.display()))
}

/// Loads an image file as a data URI, sniffing its MIME type from the bytes.
fn read_image_data_uri(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    Ok(bytes_data_uri(sniff_image_mime(&bytes), &bytes))
}

fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(DEFAULT_IMAGE_MIME)
}

fn write_image(path: &Path, data_uri: &str) -> Result<()> {
    let bytes = decode_data_uri(data_uri)?;
    write_file(path, &bytes)?;
    match image::image_dimensions(path) {
        Ok((width, height)) => println!("Wrote {} ({width}x{height})", path.display()),
        Err(_) => println!("Wrote {}", path.display()),
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
