//! JavaScript Engine Trait
//!
//! Narrow interface between the host and the embedded engine. Native
//! functions are written against [`CallArgs`] so they carry no engine types.

use crate::{HostError, JsValue, NativeError};
use std::fmt;
use std::sync::Arc;

/// Callback type for native functions exposed to JavaScript.
pub type NativeFunction = Arc<dyn Fn(&dyn CallArgs) -> Result<JsValue, NativeError> + Send + Sync>;

/// Arguments of a native call, with the engine's conversion semantics.
///
/// Missing arguments read as `undefined`.
pub trait CallArgs {
    /// Number of arguments actually passed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Argument converted with the engine's ToNumber.
    fn number(&self, index: usize) -> Result<f64, NativeError>;

    /// Argument converted with the engine's ToString.
    fn string(&self, index: usize) -> Result<String, NativeError>;
}

/// A named native function with its declared arity.
#[derive(Clone)]
pub struct NativeBinding {
    pub name: String,
    pub arity: usize,
    pub callback: NativeFunction,
}

impl NativeBinding {
    pub fn new<F>(name: impl Into<String>, arity: usize, callback: F) -> Self
    where
        F: Fn(&dyn CallArgs) -> Result<JsValue, NativeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            callback: Arc::new(callback),
        }
    }

    /// Invoke the callback directly.
    pub fn call(&self, args: &dyn CallArgs) -> Result<JsValue, NativeError> {
        (self.callback)(args)
    }
}

impl fmt::Debug for NativeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBinding")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// An engine with a single global scope that can run scripts.
///
/// Creating the context is the implementor's constructor; dropping it
/// releases the engine.
pub trait ScriptHost {
    /// Define a native function as a global.
    fn define_native(&self, binding: &NativeBinding) -> Result<(), HostError>;

    /// Evaluate a script in the global scope.
    fn evaluate(&self, source: &str) -> Result<JsValue, HostError>;

    /// Define every binding, stopping at the first failure.
    fn install(&self, bindings: &[NativeBinding]) -> Result<(), HostError> {
        for binding in bindings {
            self.define_native(binding)?;
        }
        Ok(())
    }
}
