//! Carousel Engine CLI
//!
//! Usage:
//!   carousel-engine render <CATALOG> <TEMPLATE_ID> [IMAGES]... [OPTIONS]
//!   carousel-engine embed <TEMPLATE> <NODE_ID> <IMAGE> [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>   Engine configuration (TOML format)
//!   -o, --output <FILE>   Write the result to a file instead of stdout
//!   -f, --format <FMT>    Output format for `render`: svg or json
//!   -h, --help            Print help

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use carousel_engine::bundle::{self, DEFAULT_CHUNK_WIDTH};
use carousel_engine::{
    render_carousel, Canvas, EngineConfig, Preview, SvgConfig, TemplateCatalog,
};

#[derive(Parser)]
#[command(name = "carousel-engine")]
#[command(about = "Build social-media carousels from design templates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a carousel on an in-memory canvas and print a preview
    Render {
        /// Template bundle, single template file, or directory with template-index.json
        catalog: PathBuf,

        /// Id of the template to instantiate
        template: String,

        /// Photos bound to photo-1, photo-2, ... in order
        images: Vec<PathBuf>,

        /// Engine configuration file (TOML format)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Format::Svg)]
        format: Format,

        /// Hide the dashed slice outlines in SVG output
        #[arg(long)]
        no_slices: bool,
    },

    /// Embed an image into a template document under a node id
    Embed {
        /// Template JSON file
        template: PathBuf,

        /// Node id the image belongs to
        node: String,

        /// Image file to embed
        image: PathBuf,

        /// Maximum characters per base64 chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_WIDTH)]
        chunk_width: usize,

        /// Output file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Svg,
    Json,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> carousel_engine::Result<()> {
    match command {
        Command::Render {
            catalog,
            template,
            images,
            config,
            output,
            format,
            no_slices,
        } => {
            let config = match &config {
                Some(path) => EngineConfig::from_file(path)?,
                None => EngineConfig::default(),
            };
            let catalog = Arc::new(TemplateCatalog::load(&catalog)?);
            info!(templates = catalog.len(), "catalog loaded");

            let images = images
                .iter()
                .map(fs::read)
                .collect::<Result<Vec<_>, _>>()?;

            let preview = render_carousel(catalog, &template, images, config).await?;
            let rendered = match format {
                Format::Svg => preview.to_svg(&SvgConfig::default().with_slices(!no_slices)),
                Format::Json => serde_json::to_string_pretty(&summary(&preview))?,
            };
            write_output(output.as_deref(), &rendered)
        }
        Command::Embed {
            template,
            node,
            image,
            chunk_width,
            output,
        } => {
            let document = fs::read_to_string(&template)?;
            let bytes = fs::read(&image)?;
            let embedded = bundle::embed_image(&document, &node, &bytes, chunk_width)?;
            info!(node = %node, bytes = bytes.len(), "image embedded");
            write_output(output.as_deref(), &embedded)
        }
    }
}

/// Machine-readable account of what was built
fn summary(preview: &Preview) -> serde_json::Value {
    let outcome = &preview.outcome;
    let stats = &outcome.stats;
    let slices: Vec<String> = outcome
        .slices
        .iter()
        .filter_map(|id| preview.canvas.element(*id))
        .map(|slice| slice.name.clone())
        .collect();

    serde_json::json!({
        "template": outcome.template_id,
        "tree": preview.outline(),
        "slices": slices,
        "instructions": outcome.instructions.is_some(),
        "degraded": outcome.degraded.iter().map(|d| format!("{d:?}")).collect::<Vec<_>>(),
        "stats": {
            "elements": stats.elements,
            "skipped": stats.skipped,
            "failed": stats.failed,
            "photosBound": stats.photos_bound,
            "embeddedBound": stats.embedded_bound,
            "fillsDropped": stats.fills_dropped,
        },
        "grayscaleWrappers": outcome.composite.grayscale_wrappers.len(),
        "repositionedTexts": outcome.composite.repositioned_texts,
        "events": preview.events,
    })
}

fn write_output(path: Option<&Path>, content: &str) -> carousel_engine::Result<()> {
    match path {
        Some(path) => fs::write(path, content)?,
        None => println!("{}", content),
    }
    Ok(())
}
