use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use engine::optimize::{AlphaGrid, AlphaOptimizer, LabeledQuery};
use engine::persist::{load_snapshot, save_profiles, save_snapshot, SnapshotPaths};
use engine::{EngineConfig, HybridIndex, MetadataFilter, QueryCategory};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputPassage {
    id: String,
    text: String,
    dense: Vec<f32>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct InputLabeledQuery {
    text: String,
    dense: Vec<f32>,
    expected_id: String,
    /// Defaults to the engine's own classification of `text`.
    category: Option<QueryCategory>,
}

#[derive(Parser)]
#[command(name = "tuner")]
#[command(about = "Build, query and tune hybrid retrieval snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index snapshot from passage JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output snapshot directory
        #[arg(long)]
        output: String,
        /// Dense vector dimension; inferred from the first passage if omitted
        #[arg(long)]
        dimension: Option<usize>,
        /// File with one compound sub-term per line; enables compound splitting
        #[arg(long)]
        compound_lexicon: Option<String>,
    },
    /// Run one query against a snapshot
    Search {
        /// Snapshot directory
        #[arg(long)]
        index: String,
        /// Query text
        #[arg(long)]
        query: String,
        /// JSON file holding the query's dense vector (a float array).
        /// Without it the query runs lexical-only at alpha 0.
        #[arg(long)]
        dense_file: Option<String>,
        /// Fusion weight; defaults to the classifier-selected profile value
        /// (or 0 when no dense vector is given)
        #[arg(long)]
        alpha: Option<f32>,
        /// Number of results to return
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Metadata filter, key=value, repeatable
        #[arg(long)]
        filter: Vec<String>,
    },
    /// Grid-search per-category fusion weights against labeled queries
    Tune {
        /// Snapshot directory
        #[arg(long)]
        index: String,
        /// Labeled query JSON/JSONL files or a directory
        #[arg(long)]
        queries: String,
        /// Rank cutoff per evaluation query
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Alpha grid step
        #[arg(long, default_value_t = 0.1)]
        grid_step: f32,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            dimension,
            compound_lexicon,
        } => build(&input, &output, dimension, compound_lexicon.as_deref()),
        Commands::Search {
            index,
            query,
            dense_file,
            alpha,
            top_k,
            filter,
        } => search(&index, &query, dense_file.as_deref(), alpha, top_k, &filter),
        Commands::Tune {
            index,
            queries,
            top_k,
            grid_step,
        } => tune(&index, &queries, top_k, grid_step),
    }
}

fn build(
    input: &str,
    output: &str,
    dimension: Option<usize>,
    compound_lexicon: Option<&str>,
) -> Result<()> {
    let mut config = EngineConfig::default();
    if let Some(path) = compound_lexicon {
        let lexicon = fs::read_to_string(path)
            .with_context(|| format!("reading compound lexicon {path}"))?;
        config.normalizer.compound_lexicon = lexicon
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        config.normalizer.compound_splitting = true;
    }

    let passages = collect_records::<InputPassage>(Path::new(input))?;
    let Some(first) = passages.first() else {
        bail!("no passages found under {input}");
    };
    let dimension = dimension.unwrap_or(first.dense.len());

    let index = HybridIndex::new(dimension, config);
    for passage in passages {
        index.upsert(passage.id, &passage.text, passage.dense, passage.metadata)?;
    }
    tracing::info!(
        num_passages = index.len(),
        num_terms = index.vocabulary_size(),
        dimension,
        "ingested passages"
    );

    let paths = SnapshotPaths::new(output);
    save_snapshot(&paths, &index, now_rfc3339())?;
    tracing::info!(output, "snapshot written");
    Ok(())
}

fn search(
    index_dir: &str,
    query: &str,
    dense_file: Option<&str>,
    alpha: Option<f32>,
    top_k: usize,
    filter: &[String],
) -> Result<()> {
    let paths = SnapshotPaths::new(index_dir);
    let index = load_snapshot(&paths, EngineConfig::default())?;

    let (dense, alpha) = match dense_file {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading dense vector {path}"))?;
            let dense: Vec<f32> = serde_json::from_str(&raw)?;
            (dense, alpha)
        }
        // no dense signal available: zero vector, pure lexical ranking
        None => (vec![0.0; index.dimension()], Some(alpha.unwrap_or(0.0))),
    };

    let filter = if filter.is_empty() {
        None
    } else {
        Some(MetadataFilter::parse(filter)?)
    };

    let category = index.classify(query);
    let hits = index.query(query, &dense, alpha, top_k, filter.as_ref())?;

    println!("query: {query}");
    println!("category: {category}");
    println!("hits: {}", hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>3}. {:.4}  {}", rank + 1, hit.score, hit.id);
        for (key, value) in &hit.metadata {
            println!("       {key}: {value}");
        }
    }
    Ok(())
}

fn tune(index_dir: &str, queries: &str, top_k: usize, grid_step: f32) -> Result<()> {
    let paths = SnapshotPaths::new(index_dir);
    let index = load_snapshot(&paths, EngineConfig::default())?;

    let raw = collect_records::<InputLabeledQuery>(Path::new(queries))?;
    if raw.is_empty() {
        bail!("no labeled queries found under {queries}");
    }
    let labeled: Vec<LabeledQuery> = raw
        .into_iter()
        .map(|q| {
            let category = q.category.unwrap_or_else(|| index.classify(&q.text));
            LabeledQuery {
                text: q.text,
                dense: q.dense,
                expected_id: q.expected_id,
                category,
            }
        })
        .collect();
    tracing::info!(num_queries = labeled.len(), top_k, grid_step, "tuning alphas");

    let optimizer = AlphaOptimizer::new(AlphaGrid::new(grid_step), top_k);
    let tuned = optimizer.optimize(&labeled, &index)?;

    index.apply_tuned_alphas(&tuned);
    save_profiles(&paths, &index.alpha_profile())?;

    println!("category                  alpha");
    for (category, alpha) in &tuned {
        println!("{:<25} {alpha:.2}", category.to_string());
    }
    println!("profiles updated in {index_dir}");
    Ok(())
}

/// Gather deserializable records from a JSONL file, a JSON file (single
/// object or array), or a directory tree of such files.
fn collect_records<T: for<'de> Deserialize<'de>>(input: &Path) -> Result<Vec<T>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input path {} does not exist", input.display());
    }

    let mut records = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            let f = File::open(&file)?;
            for line in BufReader::new(f).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                records.push(serde_json::from_str(&line)?);
            }
        } else {
            let f = File::open(&file)?;
            let json: serde_json::Value = serde_json::from_reader(BufReader::new(f))?;
            match json {
                serde_json::Value::Array(arr) => {
                    for v in arr {
                        records.push(serde_json::from_value(v)?);
                    }
                }
                other => records.push(serde_json::from_value(other)?),
            }
        }
    }
    Ok(records)
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| String::new())
}
