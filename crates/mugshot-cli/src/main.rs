use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image::RgbImage;
use mugshot_core::{
    DetectorRegistry, Embedding, FaceBox, FaceEmbedder, MatchError, ModelKind, OracleError,
};
use mugshot_engine::stub::{GridEmbedder, StubDetector};
use mugshot_engine::{spawn_engine, Config, EngineError, EnrollOptions, ModelRegistry, NoVideo};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mugshot", about = "Face enrollment and recognition pipeline")]
struct Cli {
    /// Use the built-in diagnostic oracles (full-frame detector,
    /// mean-color embedder) instead of host-registered face models.
    #[arg(long, global = true)]
    stub_oracles: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll the training corpus into a model's gallery
    Enroll {
        /// Detection model family (default: MUGSHOT_MODEL or yolov8)
        #[arg(short, long)]
        model: Option<ModelKind>,
        /// Full retrain: discard prior encodings and ledger for this model
        #[arg(long)]
        full: bool,
    },
    /// Recognize an embedding (JSON float array) against a model's gallery
    Recognize {
        /// Path to a JSON file containing the probe embedding
        embedding: PathBuf,
        #[arg(short, long)]
        model: Option<ModelKind>,
    },
    /// List enrolled identities for a model
    List {
        #[arg(short, long)]
        model: Option<ModelKind>,
    },
    /// Remove an identity: gallery entries, ledger entries, source photos
    Remove {
        label: String,
    },
    /// Show per-model gallery status
    Status,
}

/// Placeholder until a host embedding model is wired in. Enrollment
/// without --stub-oracles fails earlier, on detector availability, so
/// this is never reached.
struct NoEmbedder;

impl FaceEmbedder for NoEmbedder {
    fn embed(&mut self, _image: &RgbImage, _face: &FaceBox) -> Result<Embedding, OracleError> {
        Err(OracleError::Embedding(
            "no embedding model available".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::debug!(data_dir = %config.data_dir.display(),
        training_dir = %config.training_dir.display(), "configuration loaded");

    let mut detectors = DetectorRegistry::new();
    let embedder: Box<dyn FaceEmbedder> = if cli.stub_oracles {
        for kind in ModelKind::ALL {
            detectors.register(kind, || Ok(Box::new(StubDetector)));
        }
        Box::new(GridEmbedder)
    } else {
        // Real detector families are registered by host builds; without
        // them, enrollment reports the family as unavailable.
        Box::new(NoEmbedder)
    };

    let registry = ModelRegistry::new(&config.data_dir, detectors);
    let engine = spawn_engine(registry, embedder, Box::new(NoVideo));

    match cli.command {
        Commands::Enroll { model, full } => {
            let kind = model.unwrap_or(config.model);
            let mut opts = if full {
                EnrollOptions::full_retrain(kind)
            } else {
                EnrollOptions::new(kind)
            };
            opts.video_sample_fps = config.video_sample_fps;
            let report = engine
                .enroll(config.training_dir.clone(), opts)
                .await
                .with_context(|| format!("enrollment failed for {kind}"))?;
            println!("{}", report.summary());
        }
        Commands::Recognize { embedding, model } => {
            let kind = model.unwrap_or(config.model);
            let raw = std::fs::read_to_string(&embedding)
                .with_context(|| format!("cannot read {}", embedding.display()))?;
            let values: Vec<f32> =
                serde_json::from_str(&raw).context("embedding must be a JSON float array")?;

            match engine
                .recognize(Embedding::new(values), kind, config.match_threshold)
                .await
            {
                Ok(Some(m)) => println!(
                    "{} (distance {:.3}, weight {:.2}, {} vote(s))",
                    m.label, m.distance, m.weight, m.votes
                ),
                Ok(None) => println!("no match"),
                Err(EngineError::Match(MatchError::NoTrainedData)) => {
                    bail!("no trained data for {kind}; run `mugshot enroll` first")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::List { model } => {
            let kind = model.unwrap_or(config.model);
            let gallery = engine.gallery(kind).await?;
            if gallery.is_empty() {
                println!("{kind}: not trained");
            } else {
                for (label, count) in gallery.identities() {
                    println!("{label}  {count} encoding(s)");
                }
            }
        }
        Commands::Remove { label } => {
            let removed = engine
                .remove_identity(config.training_dir.clone(), label.clone())
                .await?;
            if removed {
                println!("removed {label}");
            } else {
                println!("nothing to remove for {label}");
            }
        }
        Commands::Status => {
            for kind in ModelKind::ALL {
                let gallery = engine.gallery(kind).await?;
                if gallery.is_empty() {
                    println!("{kind}: not trained");
                } else {
                    println!(
                        "{kind}: {} identit{}, {} encoding(s)",
                        gallery.identity_count(),
                        if gallery.identity_count() == 1 { "y" } else { "ies" },
                        gallery.len()
                    );
                }
            }
        }
    }

    Ok(())
}
