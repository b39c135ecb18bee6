pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod feature_model;
pub mod input;
pub mod registry;
pub mod script;

pub use codec::{Codec, RecordDecoder, TextualRecord};
pub use config::{ConfigLoader, EngineSettings, Options};
pub use dispatcher::{Bridge, Invocation};
pub use error::{FlamapyError, Result};
pub use feature_model::FeatureModel;
pub use registry::{resolve, Operation, OperationSpec, ParamKind, ParamSpec, Protocol, Technique};
#[cfg(test)] mod testing;
