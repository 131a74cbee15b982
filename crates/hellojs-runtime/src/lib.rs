//! hellojs JavaScript Host
//!
//! QuickJS-based host that evaluates a single script with a few native
//! functions installed in the global scope.
//!
//! Features:
//! - QuickJS runtime via rquickjs
//! - `rand()`, `srand(seed)` and `system(cmd)` backed by the C library
//! - Diagnostics in `file:line:message` form

mod config;
mod engine_trait;
mod error;
mod natives;
mod runtime;

pub use config::{ConfigError, HostConfig};
pub use engine_trait::{CallArgs, NativeBinding, NativeFunction, ScriptHost};
pub use error::{HostError, NativeError, ScriptError};
pub use natives::host_functions;
pub use runtime::QuickJsHost;

/// Create a host, install the native functions and evaluate `code`.
///
/// The engine is torn down before this returns, whether or not the script
/// succeeded.
pub fn run(config: &HostConfig, code: &str) -> Result<JsValue, HostError> {
    let host = QuickJsHost::new(config)?;
    host.install(&host_functions())?;
    host.evaluate(code)
}

/// JavaScript value
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object,
    Array,
    Function,
}

impl JsValue {
    /// Name of the value's type as `typeof` would report it
    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null | JsValue::Object | JsValue::Array => "object",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Function => "function",
        }
    }
}
