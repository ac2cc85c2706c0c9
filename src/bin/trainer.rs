use clap::Parser;
use colored::Colorize;
use kmeans_core::{Driver, Init, TrainingParameters};
use kmeans_core::frame::{Frame, VecFrame};
use std::path::PathBuf;
use std::process::exit;

/// Train a K-Means|| model over a CSV file and write the resulting
/// model to disk (or stdout) as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to a CSV file, first row column names, one column per
    /// feature. Blank fields are treated as missing.
    data: PathBuf,

    /// Baseline training parameters loaded from a JSON file; any of
    /// `--k`, `--max-iters`, `--init`, `--standardize`, `--seed` given
    /// on the command line override the corresponding field.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of clusters.
    #[arg(short, long)]
    k: Option<u64>,

    /// Maximum number of Lloyd iterations.
    #[arg(long)]
    max_iters: Option<u64>,

    /// Centroid initialization strategy.
    #[arg(long, value_enum)]
    init: Option<InitArg>,

    /// Center and scale numeric columns before clustering.
    #[arg(long)]
    standardize: bool,

    /// RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Column names treated as categorical, given as `name:cardinality`
    /// (e.g. `--categorical color:4`). Repeatable.
    #[arg(long = "categorical", value_name = "NAME:CARDINALITY")]
    categoricals: Vec<String>,

    /// Row-range size handed to each map-phase chunk. Defaults to
    /// dividing the dataset evenly across `--workers` worker threads.
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Number of worker threads to target when `--chunk-size` is not
    /// given explicitly. Defaults to the number of logical CPUs.
    #[arg(long)]
    workers: Option<usize>,

    /// Write the trained model as JSON to this path instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render a terminal progress bar for each phase.
    #[arg(long)]
    progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum InitArg {
    None,
    PlusPlus,
    Furthest,
}

impl From<InitArg> for Init {
    fn from(value: InitArg) -> Self {
        match value {
            InitArg::None => Init::None,
            InitArg::PlusPlus => Init::PlusPlus,
            InitArg::Furthest => Init::Furthest,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{}", format!("{e:#}").red());
        exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let categoricals = parse_categoricals(&cli.categoricals)?;
    let mut params = load_params(&cli.config)?;
    apply_overrides(&mut params, &cli);

    log::info!(
        "{:<32}{:<32}",
        "loading dataset",
        format!("{}", cli.data.display()),
    );
    let mut frame = load_csv(&cli.data, &categoricals)?;

    let workers = cli.workers.unwrap_or_else(num_cpus::get).max(1);
    let chunk_size = cli
        .chunk_size
        .unwrap_or_else(|| (frame.num_rows() / workers as u64).max(1));

    log::info!(
        "{:<32}{:<32}",
        "training",
        format!(
            "k={} init={:?} standardize={} seed={} workers={workers} chunk_size={chunk_size}",
            params.k, params.init, params.standardize, params.seed
        ),
    );
    let driver = Driver::new(chunk_size).with_progress(cli.progress);
    let job = driver.train(&mut frame, params)?;
    let model = job
        .snapshot()
        .ok_or_else(|| anyhow::anyhow!("training finished without publishing a model"))?;

    log::info!(
        "{:<32}{:<32}",
        "finished".green().to_string(),
        format!(
            "iterations={} avgWithinSS={:.6}",
            model.iterations, model.avg_within_ss
        ),
    );

    let json = serde_json::to_string_pretty(&model)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)?;
            log::info!("{:<32}{:<32}", "wrote model", format!("{}", path.display()));
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Parse `--categorical name:cardinality` arguments.
fn parse_categoricals(raw: &[String]) -> anyhow::Result<Vec<(String, usize)>> {
    raw.iter()
        .map(|entry| {
            let (name, card) = entry
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("malformed --categorical `{entry}`, expected NAME:CARDINALITY"))?;
            let card: usize = card
                .parse()
                .map_err(|_| anyhow::anyhow!("malformed cardinality in --categorical `{entry}`"))?;
            Ok((name.to_string(), card))
        })
        .collect()
}

fn load_params(config: &Option<PathBuf>) -> anyhow::Result<TrainingParameters> {
    match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(TrainingParameters {
            k: 2,
            max_iters: 100,
            init: Init::PlusPlus,
            standardize: false,
            seed: 0,
        }),
    }
}

fn apply_overrides(params: &mut TrainingParameters, cli: &Cli) {
    if let Some(k) = cli.k {
        params.k = k;
    }
    if let Some(max_iters) = cli.max_iters {
        params.max_iters = max_iters;
    }
    if let Some(init) = cli.init {
        params.init = init.into();
    }
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }
    if cli.standardize {
        params.standardize = true;
    }
}

/// Load a CSV file into a [`VecFrame`]. Columns named in `categoricals`
/// are parsed as integer levels with the given cardinality; every other
/// column is parsed as a numeric `f64`. Empty fields become `NaN`
/// (missing).
fn load_csv(path: &PathBuf, categoricals: &[(String, usize)]) -> anyhow::Result<VecFrame> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();

    let mut numeric: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    let mut raw_cats: Vec<Vec<i32>> = vec![Vec::new(); headers.len()];

    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(anyhow::anyhow!(
                "row {row_idx} has {} fields, expected {}",
                record.len(),
                headers.len()
            ));
        }
        for (col, field) in record.iter().enumerate() {
            let field = field.trim();
            let is_cat = categoricals.iter().any(|(name, _)| name == &headers[col]);
            if is_cat {
                let level = if field.is_empty() {
                    -1
                } else {
                    field
                        .parse::<i32>()
                        .map_err(|_| anyhow::anyhow!("row {row_idx} col `{}`: invalid level `{field}`", headers[col]))?
                };
                raw_cats[col].push(level);
            } else {
                let value = if field.is_empty() {
                    f64::NAN
                } else {
                    field
                        .parse::<f64>()
                        .map_err(|_| anyhow::anyhow!("row {row_idx} col `{}`: invalid number `{field}`", headers[col]))?
                };
                numeric[col].push(value);
            }
        }
    }

    let mut numeric_names = Vec::new();
    let mut numeric_cols = Vec::new();
    for (col, name) in headers.iter().enumerate() {
        if categoricals.iter().any(|(n, _)| n == name) {
            continue;
        }
        numeric_names.push(name.clone());
        numeric_cols.push(std::mem::take(&mut numeric[col]));
    }
    let mut frame = VecFrame::from_numeric(numeric_names, numeric_cols);

    for (name, cardinality) in categoricals {
        let col = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow::anyhow!("categorical column `{name}` not found in `{}`", path.display()))?;
        frame.push_categorical(name.clone(), std::mem::take(&mut raw_cats[col]), *cardinality);
    }

    Ok(frame)
}
