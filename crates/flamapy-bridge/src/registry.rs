//! Solving backend selection.
//!
//! Every logical operation is described by a static [`OperationSpec`]: which
//! techniques it supports, the engine identifier for each of them, whether
//! the direct method takes the satisfiability flag, and its parameters.
//! The table is an exhaustive `match`, so an operation without an entry does
//! not compile.

use std::fmt;
use std::str::FromStr;

use crate::error::{FlamapyError, Result};

/// The analysis strategy used to answer a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Technique {
    /// Library methods on a feature-model handle
    #[default]
    Basic,
    /// SAT encoding pipeline
    Pysat,
    /// Binary decision diagram pipeline
    Bdd,
    /// Conflict and diagnosis SAT pipeline
    PysatDiagnosis,
}

impl Technique {
    pub fn all() -> &'static [Technique] {
        &[
            Technique::Basic,
            Technique::Pysat,
            Technique::Bdd,
            Technique::PysatDiagnosis,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Technique::Basic => "BASIC",
            Technique::Pysat => "PYSAT",
            Technique::Bdd => "BDD",
            Technique::PysatDiagnosis => "PYSAT-DIAGNOSIS",
        }
    }

    /// Name of the model-to-model transformation producing the solving
    /// representation, `None` for the direct protocol.
    pub fn transformation(&self) -> Option<&'static str> {
        match self {
            Technique::Basic => None,
            Technique::Pysat => Some("pysat"),
            Technique::Bdd => Some("bdd"),
            Technique::PysatDiagnosis => Some("pysat_diagnosis"),
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Technique {
    type Err = FlamapyError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('_', "-");
        Technique::all()
            .iter()
            .copied()
            .find(|t| t.name() == normalized)
            .ok_or_else(|| FlamapyError::UnknownTechnique(s.to_string()))
    }
}

/// A logical analysis operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AtomicSets,
    AverageBranchingFactor,
    Commonality,
    Configurations,
    ConfigurationsNumber,
    CoreFeatures,
    CountLeafs,
    DeadFeatures,
    EstimatedNumberOfConfigurations,
    FalseOptionalFeatures,
    FeatureAncestors,
    FilterFeatures,
    LeafFeatures,
    MaxDepth,
    Satisfiable,
    SatisfiableConfiguration,
    UniqueFeatures,
    VariantFeatures,
    ProductDistribution,
    FeatureInclusionProbability,
    Diagnosis,
    Conflicts,
}

impl Operation {
    pub fn all() -> &'static [Operation] {
        use Operation::*;
        &[
            AtomicSets,
            AverageBranchingFactor,
            Commonality,
            Configurations,
            ConfigurationsNumber,
            CoreFeatures,
            CountLeafs,
            DeadFeatures,
            EstimatedNumberOfConfigurations,
            FalseOptionalFeatures,
            FeatureAncestors,
            FilterFeatures,
            LeafFeatures,
            MaxDepth,
            Satisfiable,
            SatisfiableConfiguration,
            UniqueFeatures,
            VariantFeatures,
            ProductDistribution,
            FeatureInclusionProbability,
            Diagnosis,
            Conflicts,
        ]
    }

    /// The camelCase name callers know the operation by
    pub fn name(&self) -> &'static str {
        use Operation::*;
        match self {
            AtomicSets => "atomicSets",
            AverageBranchingFactor => "averageBranchingFactor",
            Commonality => "commonality",
            Configurations => "configurations",
            ConfigurationsNumber => "configurationsNumber",
            CoreFeatures => "coreFeatures",
            CountLeafs => "countLeafs",
            DeadFeatures => "deadFeatures",
            EstimatedNumberOfConfigurations => "estimatedNumberOfConfigurations",
            FalseOptionalFeatures => "falseOptionalFeatures",
            FeatureAncestors => "featureAncestors",
            FilterFeatures => "filterFeatures",
            LeafFeatures => "leafFeatures",
            MaxDepth => "maxDepth",
            Satisfiable => "satisfiable",
            SatisfiableConfiguration => "satisfiableConfiguration",
            UniqueFeatures => "uniqueFeatures",
            VariantFeatures => "variantFeatures",
            ProductDistribution => "productDistribution",
            FeatureInclusionProbability => "featureInclusionProbability",
            Diagnosis => "diagnosis",
            Conflicts => "conflicts",
        }
    }

    /// The snake_case spelling of [`Operation::name`]
    pub fn snake_name(&self) -> String {
        let mut snake = String::with_capacity(self.name().len() + 4);
        for c in self.name().chars() {
            if c.is_ascii_uppercase() {
                snake.push('_');
                snake.push(c.to_ascii_lowercase());
            } else {
                snake.push(c);
            }
        }
        snake
    }

    /// BASIC, or the only technique of a pinned operation
    pub fn default_technique(&self) -> Technique {
        self.spec().pinned().unwrap_or_default()
    }

    pub fn spec(&self) -> OperationSpec {
        use Operation::*;
        match self {
            AtomicSets => OperationSpec::direct("atomic_sets"),
            AverageBranchingFactor => OperationSpec::direct("average_branching_factor"),
            Commonality => OperationSpec::direct("commonality").params(&[CONFIGURATION]),
            Configurations => OperationSpec::direct("configurations")
                .sat_flag()
                .pysat("PySATConfigurations")
                .bdd("BDDConfigurations"),
            ConfigurationsNumber => OperationSpec::direct("configurations_number")
                .sat_flag()
                .pysat("PySATConfigurationsNumber")
                .bdd("BDDConfigurationsNumber"),
            CoreFeatures => OperationSpec::direct("core_features")
                .pysat("PySATCoreFeatures")
                .bdd("BDDCoreFeatures"),
            CountLeafs => OperationSpec::direct("count_leafs"),
            DeadFeatures => OperationSpec::direct("dead_features")
                .pysat("PySATDeadFeatures")
                .bdd("BDDDeadFeatures"),
            EstimatedNumberOfConfigurations => {
                OperationSpec::direct("estimated_number_of_configurations")
            }
            FalseOptionalFeatures => {
                OperationSpec::direct("false_optional_features").pysat("PySATFalseOptionalFeatures")
            }
            FeatureAncestors => OperationSpec::direct("feature_ancestors").params(&[FEATURE]),
            FilterFeatures => OperationSpec::direct("filter").params(&[CONFIGURATION]),
            LeafFeatures => OperationSpec::direct("leaf_features"),
            MaxDepth => OperationSpec::direct("max_depth"),
            Satisfiable => OperationSpec::direct("satisfiable")
                .pysat("PySATSatisfiable")
                .bdd("BDDSatisfiable"),
            SatisfiableConfiguration => OperationSpec::direct("satisfiable_configuration")
                .params(&[CONFIGURATION, FULL_CONFIGURATION]),
            UniqueFeatures => OperationSpec::pipeline().bdd("BDDUniqueFeatures"),
            VariantFeatures => OperationSpec::pipeline().bdd("BDDVariantFeatures"),
            ProductDistribution => OperationSpec::pipeline().bdd("BDDProductDistribution"),
            FeatureInclusionProbability => {
                OperationSpec::pipeline().bdd("BDDFeatureInclusionProbability")
            }
            Diagnosis => OperationSpec::pipeline().diagnosis("Glucose3Diagnosis"),
            Conflicts => OperationSpec::pipeline().diagnosis("Glucose3Conflict"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = FlamapyError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Operation::all()
            .iter()
            .copied()
            .find(|op| op.name() == s || op.snake_name() == s)
            .ok_or_else(|| FlamapyError::UnknownOperation(s.to_string()))
    }
}

/// How a parameter value must look on the host side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A configuration file path or raw configuration text
    Configuration,
    /// A feature name
    Feature,
    /// A strict boolean
    Flag,
}

impl ParamKind {
    pub fn expected(&self) -> &'static str {
        match self {
            ParamKind::Configuration | ParamKind::Feature => "string",
            ParamKind::Flag => "boolean",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name on the engine method
    pub name: &'static str,
    pub kind: ParamKind,
    /// Passed by keyword rather than position
    pub keyword: bool,
    pub required: bool,
}

pub const CONFIGURATION: ParamSpec = ParamSpec {
    name: "configuration_path",
    kind: ParamKind::Configuration,
    keyword: true,
    required: true,
};

pub const FEATURE: ParamSpec = ParamSpec {
    name: "feature_name",
    kind: ParamKind::Feature,
    keyword: false,
    required: true,
};

pub const FULL_CONFIGURATION: ParamSpec = ParamSpec {
    name: "full_configuration",
    kind: ParamKind::Flag,
    keyword: true,
    required: false,
};

/// Registry entry for one logical operation
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    /// Method on the feature-model handle (BASIC)
    pub method: Option<&'static str>,
    /// The method takes the "use satisfiability solving" flag
    pub requires_sat_flag: bool,
    pub pysat: Option<&'static str>,
    pub bdd: Option<&'static str>,
    pub diagnosis: Option<&'static str>,
    pub params: &'static [ParamSpec],
}

impl OperationSpec {
    const fn direct(method: &'static str) -> Self {
        Self {
            method: Some(method),
            requires_sat_flag: false,
            pysat: None,
            bdd: None,
            diagnosis: None,
            params: &[],
        }
    }

    const fn pipeline() -> Self {
        Self {
            method: None,
            requires_sat_flag: false,
            pysat: None,
            bdd: None,
            diagnosis: None,
            params: &[],
        }
    }

    const fn sat_flag(self) -> Self {
        Self {
            requires_sat_flag: true,
            ..self
        }
    }

    const fn pysat(self, operation: &'static str) -> Self {
        Self {
            pysat: Some(operation),
            ..self
        }
    }

    const fn bdd(self, operation: &'static str) -> Self {
        Self {
            bdd: Some(operation),
            ..self
        }
    }

    const fn diagnosis(self, operation: &'static str) -> Self {
        Self {
            diagnosis: Some(operation),
            ..self
        }
    }

    const fn params(self, params: &'static [ParamSpec]) -> Self {
        Self { params, ..self }
    }

    /// The engine identifier used for `technique`, if supported
    pub fn engine_id(&self, technique: Technique) -> Option<&'static str> {
        match technique {
            Technique::Basic => self.method,
            Technique::Pysat => self.pysat,
            Technique::Bdd => self.bdd,
            Technique::PysatDiagnosis => self.diagnosis,
        }
    }

    pub fn supports(&self, technique: Technique) -> bool {
        self.engine_id(technique).is_some()
    }

    pub fn techniques(&self) -> Vec<Technique> {
        Technique::all()
            .iter()
            .copied()
            .filter(|t| self.supports(*t))
            .collect()
    }

    /// The single technique of an operation with no direct method
    pub fn pinned(&self) -> Option<Technique> {
        match (self.method, self.techniques().as_slice()) {
            (None, [only]) => Some(*only),
            _ => None,
        }
    }
}

/// The call convention the engine is driven with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Invoke `method` on a feature-model handle over the staged model
    Direct {
        method: &'static str,
        requires_sat_flag: bool,
    },
    /// Transform the staged model into `transformation`'s representation and
    /// execute the operation object named `operation` on it
    Pipeline {
        transformation: &'static str,
        operation: &'static str,
    },
}

impl Protocol {
    pub fn engine_id(&self) -> &'static str {
        match self {
            Protocol::Direct { method, .. } => method,
            Protocol::Pipeline { operation, .. } => operation,
        }
    }
}

/// Resolve the engine identifier and call convention for `operation` under
/// `technique`.
pub fn resolve(operation: Operation, technique: Technique) -> Result<Protocol> {
    let spec = operation.spec();
    let unsupported = || FlamapyError::UnsupportedTechnique {
        operation,
        technique,
    };

    let id = spec.engine_id(technique).ok_or_else(unsupported)?;
    match technique.transformation() {
        None => Ok(Protocol::Direct {
            method: id,
            requires_sat_flag: spec.requires_sat_flag,
        }),
        Some(transformation) => Ok(Protocol::Pipeline {
            transformation,
            operation: id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_snake(id: &str) -> bool {
        !id.is_empty() && id.chars().all(|c| c.is_ascii_lowercase() || c == '_')
    }

    #[test]
    fn test_registry_is_consistent() {
        for op in Operation::all() {
            let spec = op.spec();
            let techniques = spec.techniques();
            assert!(!techniques.is_empty(), "{} supports no technique", op);

            if let Some(method) = spec.method {
                assert!(is_snake(method), "{}: method {} is not snake_case", op, method);
            }
            for t in &techniques[..] {
                if *t == Technique::Basic {
                    continue;
                }
                let id = spec.engine_id(*t).unwrap();
                assert!(
                    id.starts_with(|c: char| c.is_ascii_uppercase()),
                    "{}: pipeline id {} is not capitalized",
                    op,
                    id
                );
            }

            // Pipeline operation objects take no arguments
            if !spec.params.is_empty() {
                assert_eq!(techniques, vec![Technique::Basic], "{} is parameterized", op);
            }
            if spec.method.is_none() {
                assert!(spec.pinned().is_some(), "{} has no default technique", op);
            }
            assert!(!spec.requires_sat_flag || spec.method.is_some());
        }
    }

    #[test]
    fn test_every_operation_listed_once() {
        let mut names: Vec<_> = Operation::all().iter().map(|op| op.name()).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn test_resolve_basic() {
        let protocol = resolve(Operation::ConfigurationsNumber, Technique::Basic).unwrap();
        assert_eq!(
            protocol,
            Protocol::Direct {
                method: "configurations_number",
                requires_sat_flag: true,
            }
        );

        let protocol = resolve(Operation::MaxDepth, Technique::Basic).unwrap();
        assert_eq!(protocol.engine_id(), "max_depth");
        assert!(matches!(protocol, Protocol::Direct { requires_sat_flag: false, .. }));
    }

    #[test]
    fn test_resolve_pipeline() {
        let protocol = resolve(Operation::ConfigurationsNumber, Technique::Bdd).unwrap();
        assert_eq!(
            protocol,
            Protocol::Pipeline {
                transformation: "bdd",
                operation: "BDDConfigurationsNumber",
            }
        );

        let protocol = resolve(Operation::Satisfiable, Technique::Pysat).unwrap();
        assert_eq!(protocol.engine_id(), "PySATSatisfiable");

        let protocol = resolve(Operation::Diagnosis, Technique::PysatDiagnosis).unwrap();
        assert_eq!(
            protocol,
            Protocol::Pipeline {
                transformation: "pysat_diagnosis",
                operation: "Glucose3Diagnosis",
            }
        );
    }

    #[test]
    fn test_resolve_unsupported_names_both() {
        let err = resolve(Operation::MaxDepth, Technique::Bdd).unwrap_err();
        assert!(matches!(
            err,
            FlamapyError::UnsupportedTechnique {
                operation: Operation::MaxDepth,
                technique: Technique::Bdd,
            }
        ));
        let message = err.to_string();
        assert!(message.contains("BDD"));
        assert!(message.contains("maxDepth"));
        assert!(err.is_precondition());
    }

    #[test]
    fn test_pinned_operations_reject_basic() {
        assert_eq!(Operation::UniqueFeatures.spec().pinned(), Some(Technique::Bdd));
        assert_eq!(Operation::Conflicts.spec().pinned(), Some(Technique::PysatDiagnosis));
        assert!(resolve(Operation::UniqueFeatures, Technique::Basic).is_err());
        assert_eq!(Operation::Satisfiable.spec().pinned(), None);
        assert_eq!(Operation::Satisfiable.default_technique(), Technique::Basic);
        assert_eq!(Operation::Diagnosis.default_technique(), Technique::PysatDiagnosis);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(
            Operation::EstimatedNumberOfConfigurations.snake_name(),
            "estimated_number_of_configurations"
        );
        assert_eq!("atomicSets".parse::<Operation>().unwrap(), Operation::AtomicSets);
        assert_eq!("count_leafs".parse::<Operation>().unwrap(), Operation::CountLeafs);
        assert!(matches!(
            "atomic".parse::<Operation>(),
            Err(FlamapyError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_technique_names() {
        assert_eq!("bdd".parse::<Technique>().unwrap(), Technique::Bdd);
        assert_eq!("pysat_diagnosis".parse::<Technique>().unwrap(), Technique::PysatDiagnosis);
        assert_eq!("PYSAT-DIAGNOSIS".parse::<Technique>().unwrap(), Technique::PysatDiagnosis);
        assert_eq!(Technique::default(), Technique::Basic);
        assert!("sat".parse::<Technique>().is_err());
    }
}
