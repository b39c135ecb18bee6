//! Engine source for the two call conventions.
//!
//! Values reach the engine as literals inside the generated source. Only
//! encoded host values are rendered, so booleans show up as `0`/`1`.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::Write;

use flamapy_embed::{EngineValue, RESULT_BINDING};

/// Staged model file name
pub const MODEL_FILE: &str = "uvlfile.uvl";

/// Staged configuration file name
pub const CONFIGURATION_FILE: &str = "config.csvconf";

/// Keyword of the "use satisfiability solving" flag on direct methods
pub const SAT_FLAG: &str = "with_sat";

const PRELUDE: &str = "\
import warnings
warnings.filterwarnings(\"ignore\", category=SyntaxWarning)
";

/// Call `method` on a feature-model handle built from the staged model.
pub fn direct_call(
    model_path: &str,
    method: &str,
    args: &[EngineValue],
    kwargs: &IndexMap<&'static str, EngineValue>,
) -> String {
    let mut call_args: Vec<String> = args.iter().map(literal).collect();
    call_args.extend(kwargs.iter().map(|(k, v)| format!("{}={}", k, literal(v))));

    let mut source = String::from(PRELUDE);
    source.push_str("from flamapy.interfaces.python.flamapy_feature_model import FLAMAFeatureModel\n\n");
    let _ = writeln!(source, "fm = FLAMAFeatureModel({})", string_literal(model_path));
    let _ = writeln!(
        source,
        "{} = fm.{}({})",
        RESULT_BINDING,
        method,
        call_args.join(", ")
    );
    source
}

/// Transform the staged model into the `transformation` representation and
/// run the operation object `operation` on it.
pub fn pipeline(model_path: &str, transformation: &str, operation: &str) -> String {
    let mut source = String::from(PRELUDE);
    source.push_str("from flamapy.core.discover import DiscoverMetamodels\n\n");
    source.push_str("dm = DiscoverMetamodels()\n");
    let _ = writeln!(
        source,
        "fm = dm.use_transformation_t2m({}, \"fm\")",
        string_literal(model_path)
    );
    let _ = writeln!(
        source,
        "model = dm.use_transformation_m2m(fm, {})",
        string_literal(transformation)
    );
    let _ = writeln!(
        source,
        "operation = dm.get_operation(model, {})",
        string_literal(operation)
    );
    source.push_str("operation.execute(model)\n");
    let _ = writeln!(source, "{} = operation.get_result()", RESULT_BINDING);
    source
}

/// Render an engine value as a source literal
pub fn literal(value: &EngineValue) -> String {
    match value {
        EngineValue::Null => "None".to_string(),
        EngineValue::Bool(true) => "True".to_string(),
        EngineValue::Bool(false) => "False".to_string(),
        EngineValue::Bit(b) => (*b as u8).to_string(),
        EngineValue::Int(i) => i.to_string(),
        EngineValue::Float(f) if f.is_nan() => "float('nan')".to_string(),
        EngineValue::Float(f) if f.is_infinite() => {
            if *f > 0.0 {
                "float('inf')".to_string()
            } else {
                "float('-inf')".to_string()
            }
        }
        EngineValue::Float(f) => format!("{:?}", f),
        EngineValue::Str(s) | EngineValue::Opaque(s) => string_literal(s),
        EngineValue::List(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", items.join(", "))
        }
        EngineValue::Map(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", string_literal(k), literal(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
        EngineValue::Handle(handle) => string_literal(&handle.repr()),
    }
}

// A JSON string literal is also a valid Python one.
fn string_literal(s: &str) -> String {
    Value::from(s).to_string()
}
