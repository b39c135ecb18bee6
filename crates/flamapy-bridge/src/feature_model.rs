//! The public per-operation API over one feature model.
//!
//! Every typed method fixes its operation and technique and goes through
//! [`FeatureModel::run`], which validates arguments before anything reaches
//! the engine:
//!
//! ```no_run
//! # #[cfg(feature = "python")]
//! # async fn demo() -> flamapy_bridge::Result<()> {
//! use flamapy_bridge::{FeatureModel, Options, Technique};
//! use flamapy_embed::PythonEngine;
//!
//! let fm = FeatureModel::<PythonEngine>::from_file("onlineshop.uvl", Options::default())?;
//! fm.initialize().await?;
//!
//! assert_eq!(fm.configurations_number(Technique::Bdd).await?, 80);
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use log::Level;
use serde_json::Value;
use tokio::sync::OnceCell;

use flamapy_embed::{Bootstrap, Engine, EngineOptions};

use crate::config::Options;
use crate::dispatcher::{Bridge, Invocation};
use crate::error::{FlamapyError, Result};
use crate::input;
use crate::registry::{Operation, ParamKind, ParamSpec, Technique};

/// A feature model bound to at most one engine session
pub struct FeatureModel<E> {
    source: Arc<str>,
    options: Options,
    bridge: OnceCell<Bridge<E>>,
}

impl<E> std::fmt::Debug for FeatureModel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureModel")
            .field("options", &self.options)
            .field("initialized", &self.bridge.initialized())
            .finish_non_exhaustive()
    }
}

impl<E: Engine> FeatureModel<E> {
    /// Create a model from a path to a UVL file or from UVL text.
    pub fn new(model: &str, options: Options) -> Result<Self> {
        let source = input::resolve(model)?;
        Ok(Self {
            source: Arc::from(source.as_ref()),
            options,
            bridge: OnceCell::new(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| FlamapyError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            source: Arc::from(source),
            options,
            bridge: OnceCell::new(),
        })
    }

    /// Create an already initialized model around an existing engine session
    pub fn with_engine(model: &str, engine: E, options: Options) -> Result<Self> {
        let bridge = Bridge::new(engine).debug(options.debug);
        let mut fm = Self::new(model, options)?;
        fm.bridge = OnceCell::new_with(Some(bridge));
        Ok(fm)
    }

    /// The UVL text every operation runs against
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_initialized(&self) -> bool {
        self.bridge.initialized()
    }

    /// Run `operation` with JSON arguments, in parameter order.
    ///
    /// Arguments are checked against the operation's parameters and
    /// configuration values are read from disk before the engine is
    /// involved. A `null` for an optional parameter leaves it out.
    pub async fn run(
        &self,
        operation: Operation,
        technique: Technique,
        args: Vec<Value>,
    ) -> Result<Value> {
        let call = prepare(operation, technique, args)?;
        let bridge = self.bridge.get().ok_or(FlamapyError::NotInitialized)?;
        bridge.invoke(Arc::clone(&self.source), call).await
    }

    async fn call(&self, operation: Operation, technique: Technique) -> Result<Value> {
        self.run(operation, technique, Vec::new()).await
    }

    /// Groups of features that always appear together
    pub async fn atomic_sets(&self) -> Result<Value> {
        self.call(Operation::AtomicSets, Technique::Basic).await
    }

    pub async fn average_branching_factor(&self) -> Result<Value> {
        self.call(Operation::AverageBranchingFactor, Technique::Basic).await
    }

    /// Share of the products that include `configuration`
    pub async fn commonality(&self, configuration: &str) -> Result<Value> {
        self.run(Operation::Commonality, Technique::Basic, vec![configuration.into()])
            .await
    }

    pub async fn configurations(&self, technique: Technique) -> Result<Value> {
        self.call(Operation::Configurations, technique).await
    }

    pub async fn configurations_number(&self, technique: Technique) -> Result<Value> {
        self.call(Operation::ConfigurationsNumber, technique).await
    }

    pub async fn core_features(&self, technique: Technique) -> Result<Value> {
        self.call(Operation::CoreFeatures, technique).await
    }

    pub async fn count_leafs(&self) -> Result<Value> {
        self.call(Operation::CountLeafs, Technique::Basic).await
    }

    pub async fn dead_features(&self, technique: Technique) -> Result<Value> {
        self.call(Operation::DeadFeatures, technique).await
    }

    pub async fn estimated_number_of_configurations(&self) -> Result<Value> {
        self.call(Operation::EstimatedNumberOfConfigurations, Technique::Basic)
            .await
    }

    pub async fn false_optional_features(&self, technique: Technique) -> Result<Value> {
        self.call(Operation::FalseOptionalFeatures, technique).await
    }

    /// Parents of `feature` up to the root, nearest first
    pub async fn feature_ancestors(&self, feature: &str) -> Result<Value> {
        self.run(Operation::FeatureAncestors, Technique::Basic, vec![feature.into()])
            .await
    }

    /// Configurations compatible with the partial `configuration`
    pub async fn filter_features(&self, configuration: &str) -> Result<Value> {
        self.run(Operation::FilterFeatures, Technique::Basic, vec![configuration.into()])
            .await
    }

    pub async fn leaf_features(&self) -> Result<Value> {
        self.call(Operation::LeafFeatures, Technique::Basic).await
    }

    pub async fn max_depth(&self) -> Result<Value> {
        self.call(Operation::MaxDepth, Technique::Basic).await
    }

    pub async fn satisfiable(&self, technique: Technique) -> Result<Value> {
        self.call(Operation::Satisfiable, technique).await
    }

    /// Whether `configuration` is valid. With `full_configuration` unset
    /// features it leaves out are free; set, they count as deselected.
    pub async fn satisfiable_configuration(
        &self,
        configuration: &str,
        full_configuration: bool,
    ) -> Result<Value> {
        self.run(
            Operation::SatisfiableConfiguration,
            Technique::Basic,
            vec![configuration.into(), full_configuration.into()],
        )
        .await
    }

    pub async fn unique_features(&self) -> Result<Value> {
        self.pinned(Operation::UniqueFeatures).await
    }

    pub async fn variant_features(&self) -> Result<Value> {
        self.pinned(Operation::VariantFeatures).await
    }

    /// Number of products per number of selected features
    pub async fn product_distribution(&self) -> Result<Value> {
        self.pinned(Operation::ProductDistribution).await
    }

    pub async fn feature_inclusion_probability(&self) -> Result<Value> {
        self.pinned(Operation::FeatureInclusionProbability).await
    }

    pub async fn diagnosis(&self) -> Result<Value> {
        self.pinned(Operation::Diagnosis).await
    }

    pub async fn conflicts(&self) -> Result<Value> {
        self.pinned(Operation::Conflicts).await
    }

    async fn pinned(&self, operation: Operation) -> Result<Value> {
        self.call(operation, operation.default_technique()).await
    }
}

impl<E: Bootstrap> FeatureModel<E> {
    /// Bootstrap the engine session. Later calls are no-ops.
    pub async fn initialize(&self) -> Result<()> {
        let debug = self.options.debug;
        let level = if debug { Level::Info } else { Level::Debug };
        let settings = EngineOptions::from(&self.options.engine);

        self.bridge
            .get_or_try_init(|| async move {
                log::log!(level, "Bootstrapping engine");
                let engine = tokio::task::spawn_blocking(move || E::bootstrap(&settings))
                    .await?
                    .map_err(FlamapyError::Bootstrap)?;
                log::log!(level, "Engine ready");
                Ok::<_, FlamapyError>(Bridge::new(engine).debug(debug))
            })
            .await?;
        Ok(())
    }
}

/// Validate `args` against the parameters of `operation` and build the call
fn prepare(operation: Operation, technique: Technique, args: Vec<Value>) -> Result<Invocation> {
    let params = operation.spec().params;
    let required = params.iter().filter(|p| p.required).count();
    if args.len() < required || args.len() > params.len() {
        let expected = if required == params.len() {
            required.to_string()
        } else {
            format!("{} to {}", required, params.len())
        };
        return Err(FlamapyError::ArgumentCount {
            operation,
            expected,
            found: args.len(),
        });
    }

    let mut call = Invocation::new(operation, technique);
    for (param, value) in params.iter().zip(args) {
        if value.is_null() && !param.required {
            continue;
        }

        let value = check(operation, param, value)?;
        if param.keyword {
            call.kwargs.insert(param.name, value);
        } else {
            call.args.push(value);
        }
    }
    Ok(call)
}

fn check(operation: Operation, param: &ParamSpec, value: Value) -> Result<Value> {
    match (param.kind, value) {
        (ParamKind::Flag, Value::Bool(b)) => Ok(Value::Bool(b)),
        (ParamKind::Feature, Value::String(name)) => Ok(Value::String(name)),
        (ParamKind::Configuration, Value::String(config)) => {
            let content = input::resolve_configuration(&config)?;
            Ok(Value::String(content.into_owned()))
        }
        (_, other) => Err(FlamapyError::InvalidParameter {
            operation,
            parameter: param.name,
            expected: param.kind.expected(),
            found: json_type(&other),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
