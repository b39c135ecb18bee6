//! Serialized operation calls against one engine.
//!
//! The engine holds a single working area and a single set of staged files,
//! so calls are strictly one at a time: the lock is held from staging through
//! decoding. Technique resolution happens before the lock is taken, which
//! keeps unsupported requests from touching the engine at all.

use std::sync::Arc;

use indexmap::IndexMap;
use log::Level;
use serde_json::Value;
use tokio::sync::Mutex;

use flamapy_embed::{EmbedError, Engine, EngineValue};

use crate::codec::Codec;
use crate::error::{FlamapyError, Result};
use crate::registry::{self, Operation, Protocol, Technique, CONFIGURATION};
use crate::script::{self, CONFIGURATION_FILE, MODEL_FILE, SAT_FLAG};

/// A single operation request with validated host arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub operation: Operation,
    pub technique: Technique,
    pub args: Vec<Value>,
    pub kwargs: IndexMap<&'static str, Value>,
}

impl Invocation {
    pub fn new(operation: Operation, technique: Technique) -> Self {
        Self {
            operation,
            technique,
            args: Vec::new(),
            kwargs: IndexMap::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name, value.into());
        self
    }

    fn arity(&self) -> usize {
        self.args.len() + self.kwargs.len()
    }
}

/// Owns the engine and runs invocations against it one at a time
pub struct Bridge<E> {
    engine: Arc<Mutex<E>>,
    codec: Arc<Codec>,
    debug: bool,
}

impl<E> std::fmt::Debug for Bridge<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("codec", &self.codec)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Bridge<E> {
    pub fn new(engine: E) -> Self {
        Self::with_codec(engine, Codec::default())
    }

    pub fn with_codec(engine: E, codec: Codec) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            codec: Arc::new(codec),
            debug: false,
        }
    }

    /// Report every dispatch at info level instead of debug
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Run `call` against `model`, the feature model's UVL text.
    pub async fn invoke(&self, model: Arc<str>, call: Invocation) -> Result<Value> {
        let protocol = registry::resolve(call.operation, call.technique)?;
        if matches!(protocol, Protocol::Pipeline { .. }) && call.arity() > 0 {
            return Err(FlamapyError::ArgumentCount {
                operation: call.operation,
                expected: "0".to_string(),
                found: call.arity(),
            });
        }

        let level = if self.debug { Level::Info } else { Level::Debug };
        log::log!(
            level,
            "Running {} with {} as {}",
            call.operation,
            call.technique,
            protocol.engine_id()
        );

        let operation = call.operation;
        let codec = Arc::clone(&self.codec);
        let mut engine = Arc::clone(&self.engine).lock_owned().await;

        let outcome =
            tokio::task::spawn_blocking(move || execute(&mut *engine, &codec, &model, protocol, call))
                .await?;

        match outcome {
            Ok(value) => {
                log::trace!("{} returned {}", operation, value);
                Ok(value)
            }
            Err(source) => {
                log::error!("{} failed: {}", operation, source);
                Err(FlamapyError::Engine { operation, source })
            }
        }
    }
}

fn execute<E: Engine>(
    engine: &mut E,
    codec: &Codec,
    model: &str,
    protocol: Protocol,
    mut call: Invocation,
) -> std::result::Result<Value, EmbedError> {
    let model_path = engine.stage(MODEL_FILE, model)?;
    log::debug!("Staged model at {}", model_path);

    let source = match protocol {
        Protocol::Direct {
            method,
            requires_sat_flag,
        } => {
            if let Some(Value::String(content)) = call.kwargs.get(CONFIGURATION.name) {
                let path = engine.stage(CONFIGURATION_FILE, content)?;
                log::debug!("Staged configuration at {}", path);
                call.kwargs.insert(CONFIGURATION.name, Value::String(path));
            }

            let args = Codec::encode_args(&call.args);
            let mut kwargs = Codec::encode_kwargs(&call.kwargs);
            if requires_sat_flag {
                kwargs.insert(SAT_FLAG, EngineValue::Bit(true));
            }
            script::direct_call(&model_path, method, &args, &kwargs)
        }
        Protocol::Pipeline {
            transformation,
            operation,
        } => script::pipeline(&model_path, transformation, operation),
    };

    log::trace!("Engine source:\n{}", source);
    let value = engine.execute(&source)?;
    log::trace!("Engine returned a {} value", value.kind());
    Ok(codec.decode(value))
}
