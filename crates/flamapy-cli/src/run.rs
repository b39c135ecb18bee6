//! Run command - execute one analysis and print its result as JSON.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

use flamapy_bridge::{Operation, Options, Technique};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Feature model: a UVL file or UVL text
    #[arg(value_name = "MODEL")]
    pub model: String,

    /// Operation name, camelCase or snake_case (see `flamapy operations`)
    #[arg(value_name = "OPERATION")]
    pub operation: String,

    /// Operation arguments. Valid JSON is passed as is, anything else as a
    /// string. Put `--` before arguments that start with a hyphen
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,

    /// Solving technique: basic, pysat, bdd or pysat-diagnosis
    #[arg(short, long)]
    pub technique: Option<String>,

    /// Report every engine call at info level
    #[arg(long)]
    pub debug: bool,

    /// Pretty-print the result
    #[arg(short, long)]
    pub pretty: bool,

    /// Directory to start searching for flamapy.toml from
    #[arg(short = 'd', long, default_value = ".")]
    pub working_dir: PathBuf,
}

pub async fn execute(args: RunArgs) -> Result<i32> {
    let operation: Operation = args.operation.parse()?;
    let technique = match &args.technique {
        Some(name) => name.parse::<Technique>()?,
        None => operation.default_technique(),
    };

    let mut options = Options::load(&args.working_dir).context("Failed to load options")?;
    options.debug |= args.debug;
    log::debug!("Running {} with {}: {:?}", operation, technique, options);

    let values = args.args.iter().map(|arg| parse_argument(arg)).collect();
    let result = analyze(&args.model, options, operation, technique, values).await?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", output);
    Ok(0)
}

#[cfg(feature = "python")]
async fn analyze(
    model: &str,
    options: Options,
    operation: Operation,
    technique: Technique,
    args: Vec<Value>,
) -> Result<Value> {
    use flamapy_bridge::FeatureModel;
    use flamapy_embed::PythonEngine;

    let fm = FeatureModel::<PythonEngine>::new(model, options).context("Failed to load feature model")?;
    fm.initialize().await.context("Failed to start the flamapy engine")?;

    let result = fm
        .run(operation, technique, args)
        .await
        .with_context(|| format!("{} failed", operation))?;
    Ok(result)
}

#[cfg(not(feature = "python"))]
async fn analyze(
    _model: &str,
    _options: Options,
    operation: Operation,
    _technique: Technique,
    _args: Vec<Value>,
) -> Result<Value> {
    anyhow::bail!(
        "cannot run {}: flamapy was built without an engine, rebuild with `--features python`",
        operation
    )
}

/// JSON if `arg` parses as JSON, a string otherwise
fn parse_argument(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}
