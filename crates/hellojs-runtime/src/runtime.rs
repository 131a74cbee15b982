//! JavaScript Runtime
//!
//! QuickJS-backed [`ScriptHost`].

use crate::{CallArgs, HostConfig, HostError, JsValue, NativeBinding, NativeError, ScriptError, ScriptHost};
use rquickjs::context::EvalOptions;
use rquickjs::function::Rest;
use rquickjs::{Coerced, Context, Ctx, Exception, FromJs, Function, IntoJs, Runtime, Value};

/// QuickJS runtime and context with a single global scope.
///
/// Fields drop in declaration order, so the context is always released
/// before the runtime that owns it.
pub struct QuickJsHost {
    context: Context,
    runtime: Runtime,
    config: HostConfig,
}

impl QuickJsHost {
    /// Create a runtime and a context with the standard built-ins.
    pub fn new(config: &HostConfig) -> Result<Self, HostError> {
        tracing::debug!(
            memory_limit = config.memory_limit,
            max_stack_size = config.max_stack_size,
            "Creating JavaScript runtime"
        );
        let runtime = Runtime::new().map_err(|e| HostError::Init(e.to_string()))?;
        runtime.set_memory_limit(config.memory_limit);
        runtime.set_max_stack_size(config.max_stack_size);

        let context = Context::full(&runtime).map_err(|e| HostError::Init(e.to_string()))?;

        Ok(Self {
            context,
            runtime,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Run queued promise jobs until none are left.
    pub fn run_pending_jobs(&self) -> Result<(), HostError> {
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => continue,
                Ok(false) => return Ok(()),
                Err(job) => {
                    let error = job.0.with(|ctx| {
                        let caught = ctx.catch();
                        self.describe_exception(&ctx, caught)
                    });
                    return Err(error.into());
                }
            }
        }
    }

    fn script_error(&self, ctx: &Ctx<'_>, err: rquickjs::Error) -> ScriptError {
        match err {
            rquickjs::Error::Exception => self.describe_exception(ctx, ctx.catch()),
            other => ScriptError::new(self.config.script_name.as_str(), 0, other.to_string()),
        }
    }

    /// Turn a thrown value into a diagnostic
    fn describe_exception<'js>(&self, ctx: &Ctx<'js>, caught: Value<'js>) -> ScriptError {
        let file = self.config.script_name.as_str();

        if let Some(exception) = caught.as_object().and_then(|obj| Exception::from_object(obj.clone())) {
            let name = exception.as_object().get::<_, Option<String>>("name").ok().flatten();
            let message = exception.message().unwrap_or_default();
            let message = match name {
                Some(name) if !name.is_empty() => format!("{name}: {message}"),
                _ => message,
            };
            let line = exception
                .as_object()
                .get::<_, Option<u32>>("lineNumber")
                .ok()
                .flatten()
                .or_else(|| exception.stack().as_deref().and_then(line_from_stack))
                .map(|line| line + self.config.first_line.saturating_sub(1))
                .unwrap_or(0);
            return ScriptError::new(file, line, message);
        }

        let message = match Coerced::<String>::from_js(ctx, caught) {
            Ok(text) => format!("uncaught exception: {}", text.0),
            Err(_) => "uncaught exception: (unprintable value)".to_string(),
        };
        ScriptError::new(file, 0, message)
    }
}

impl ScriptHost for QuickJsHost {
    fn define_native(&self, binding: &NativeBinding) -> Result<(), HostError> {
        tracing::debug!(name = %binding.name, arity = binding.arity, "Defining native function");
        self.context
            .with(|ctx| install_binding(&ctx, binding))
            .map_err(|e| HostError::Register {
                name: binding.name.clone(),
                reason: e.to_string(),
            })
    }

    fn evaluate(&self, source: &str) -> Result<JsValue, HostError> {
        tracing::debug!(len = source.len(), "Evaluating script");
        let value = self.context.with(|ctx| {
            let mut options = EvalOptions::default();
            options.strict = false;
            ctx.eval_with_options::<Value, _>(source, options)
                .and_then(|value| from_quickjs(&value))
                .map_err(|e| self.script_error(&ctx, e))
        })?;
        self.run_pending_jobs()?;
        Ok(value)
    }
}

impl Drop for QuickJsHost {
    fn drop(&mut self) {
        tracing::debug!("Releasing JavaScript context and runtime");
    }
}

/// Wrap a native binding in a QuickJS function and set it on the global object
fn install_binding<'js>(ctx: &Ctx<'js>, binding: &NativeBinding) -> rquickjs::Result<()> {
    let callback = binding.callback.clone();
    let func = Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| -> rquickjs::Result<JsValue> {
        let call = QuickJsArgs { ctx: &ctx, values: &args.0 };
        callback(&call).map_err(|e| raise(&ctx, e))
    })?
    .with_name(&binding.name)?
    .with_length(binding.arity)?;

    ctx.globals().set(binding.name.as_str(), func)
}

/// Throw a native failure into the engine
fn raise(ctx: &Ctx<'_>, err: NativeError) -> rquickjs::Error {
    match err {
        NativeError::Pending => rquickjs::Error::Exception,
        NativeError::Type(message) => Exception::throw_type(ctx, &message),
        NativeError::Failed(message) => Exception::throw_message(ctx, &message),
    }
}

impl From<rquickjs::Error> for NativeError {
    fn from(err: rquickjs::Error) -> Self {
        match err {
            rquickjs::Error::Exception => NativeError::Pending,
            other => NativeError::Failed(other.to_string()),
        }
    }
}

struct QuickJsArgs<'a, 'js> {
    ctx: &'a Ctx<'js>,
    values: &'a [Value<'js>],
}

impl<'js> QuickJsArgs<'_, 'js> {
    fn get(&self, index: usize) -> Value<'js> {
        self.values
            .get(index)
            .cloned()
            .unwrap_or_else(|| Value::new_undefined(self.ctx.clone()))
    }
}

impl CallArgs for QuickJsArgs<'_, '_> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn number(&self, index: usize) -> Result<f64, NativeError> {
        Ok(Coerced::<f64>::from_js(self.ctx, self.get(index))?.0)
    }

    fn string(&self, index: usize) -> Result<String, NativeError> {
        Ok(Coerced::<String>::from_js(self.ctx, self.get(index))?.0)
    }
}

impl<'js> IntoJs<'js> for JsValue {
    fn into_js(self, ctx: &Ctx<'js>) -> rquickjs::Result<Value<'js>> {
        match self {
            JsValue::Undefined => Ok(Value::new_undefined(ctx.clone())),
            JsValue::Null => Ok(Value::new_null(ctx.clone())),
            JsValue::Bool(b) => Ok(Value::new_bool(ctx.clone(), b)),
            JsValue::Number(n) => Ok(Value::new_number(ctx.clone(), n)),
            JsValue::String(s) => s.into_js(ctx),
            other => Err(rquickjs::Error::new_into_js(other.type_name(), "value")),
        }
    }
}

/// Convert a QuickJS value to a host value
fn from_quickjs(value: &Value<'_>) -> rquickjs::Result<JsValue> {
    Ok(if value.is_undefined() {
        JsValue::Undefined
    } else if value.is_null() {
        JsValue::Null
    } else if let Some(b) = value.as_bool() {
        JsValue::Bool(b)
    } else if let Some(n) = value.as_int() {
        JsValue::Number(f64::from(n))
    } else if let Some(n) = value.as_float() {
        JsValue::Number(n)
    } else if let Some(s) = value.as_string() {
        JsValue::String(s.to_string()?)
    } else if value.is_array() {
        JsValue::Array
    } else if value.is_function() {
        JsValue::Function
    } else {
        JsValue::Object
    })
}

/// First line number in a QuickJS backtrace.
///
/// Frames look like `    at <eval> (eval_script:3)`, or `    at eval_script:2:1`
/// for syntax errors, optionally with a trailing column. Native frames read
/// `(native)` and are skipped.
fn line_from_stack(stack: &str) -> Option<u32> {
    stack.lines().find_map(|frame| {
        let frame = frame.trim().strip_prefix("at ")?;
        let location = match frame.rfind('(') {
            Some(start) => frame[start + 1..].strip_suffix(')')?,
            None => frame,
        };
        location.split(':').nth(1)?.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> QuickJsHost {
        QuickJsHost::new(&HostConfig::default()).unwrap()
    }

    #[test]
    fn test_create_host() {
        let host = QuickJsHost::new(&HostConfig::default());
        assert!(host.is_ok());
    }

    #[test]
    fn test_eval_number() {
        assert_eq!(host().evaluate("1 + 2").unwrap(), JsValue::Number(3.0));
        assert_eq!(host().evaluate("0.5 * 3").unwrap(), JsValue::Number(1.5));
    }

    #[test]
    fn test_eval_string() {
        assert_eq!(host().evaluate("\"hello world\"").unwrap(), JsValue::String("hello world".into()));
    }

    #[test]
    fn test_eval_kinds() {
        let host = host();
        assert_eq!(host.evaluate("undefined").unwrap(), JsValue::Undefined);
        assert_eq!(host.evaluate("null").unwrap(), JsValue::Null);
        assert_eq!(host.evaluate("true").unwrap(), JsValue::Bool(true));
        assert_eq!(host.evaluate("[1, 2]").unwrap(), JsValue::Array);
        assert_eq!(host.evaluate("(function () {})").unwrap(), JsValue::Function);
        assert_eq!(host.evaluate("({})").unwrap(), JsValue::Object);
    }

    #[test]
    fn test_sloppy_mode() {
        assert_eq!(host().evaluate("implicitGlobal = 5; implicitGlobal").unwrap(), JsValue::Number(5.0));
    }

    #[test]
    fn test_standard_builtins() {
        let result = host().evaluate("JSON.stringify([Math.max(1, 2), Object.keys({a: 1})])").unwrap();
        assert_eq!(result, JsValue::String("[2,[\"a\"]]".into()));
    }

    #[test]
    fn test_define_native() {
        let host = host();
        let binding = NativeBinding::new("twice", 1, |args: &dyn CallArgs| Ok(JsValue::Number(args.number(0)? * 2.0)));
        host.define_native(&binding).unwrap();

        assert_eq!(host.evaluate("twice('21')").unwrap(), JsValue::Number(42.0));
        assert_eq!(host.evaluate("twice.length").unwrap(), JsValue::Number(1.0));
        assert_eq!(host.evaluate("twice.name").unwrap(), JsValue::String("twice".into()));
    }

    #[test]
    fn test_native_errors_become_exceptions() {
        let host = host();
        host.define_native(&NativeBinding::new("fail", 0, |_: &dyn CallArgs| {
            Err(NativeError::Type("bad input".to_string()))
        }))
        .unwrap();

        let result = host.evaluate("try { fail(); 'no' } catch (e) { e instanceof TypeError && e.message }").unwrap();
        assert_eq!(result, JsValue::String("bad input".into()));
    }

    #[test]
    fn test_pending_exception_is_rethrown() {
        let host = host();
        host.define_native(&NativeBinding::new("str", 1, |args: &dyn CallArgs| {
            Ok(JsValue::String(args.string(0)?))
        }))
        .unwrap();

        let result = host
            .evaluate("try { str({ toString() { throw new RangeError('custom') } }) } catch (e) { e.message }")
            .unwrap();
        assert_eq!(result, JsValue::String("custom".into()));
    }

    #[test]
    fn test_syntax_error() {
        let err = host().evaluate("var = ;").unwrap_err();
        match err {
            HostError::Script(e) => {
                assert!(e.message.starts_with("SyntaxError"), "{}", e.message);
                assert_eq!(e.file, "<command line>");
                assert_eq!(e.line, 1);
            }
            other => panic!("Expected script error, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error_on_later_line() {
        let err = host().evaluate("var x;\nvar = ;").unwrap_err();
        match err {
            HostError::Script(e) => {
                assert!(e.message.starts_with("SyntaxError"), "{}", e.message);
                assert_eq!(e.line, 2);
                assert!(e.to_string().starts_with("<command line>:2:SyntaxError"));
            }
            other => panic!("Expected script error, got {other:?}"),
        }
    }

    #[test]
    fn test_thrown_non_error() {
        let err = host().evaluate("throw 42").unwrap_err();
        match err {
            HostError::Script(e) => {
                assert_eq!(e.message, "uncaught exception: 42");
                assert_eq!(e.line, 0);
            }
            other => panic!("Expected script error, got {other:?}"),
        }
    }

    #[test]
    fn test_pending_jobs_run_after_eval() {
        let host = host();
        host.evaluate("var settled = false; Promise.resolve().then(() => { settled = true; });").unwrap();
        assert_eq!(host.evaluate("settled").unwrap(), JsValue::Bool(true));
    }

    #[test]
    fn test_memory_limit() {
        let host = QuickJsHost::new(&HostConfig::default()).unwrap();
        assert!(host.evaluate("'x'.repeat(64 * 1024 * 1024)").is_err());
    }

    #[test]
    fn test_line_from_stack() {
        assert_eq!(line_from_stack("    at <eval> (eval_script:3)\n"), Some(3));
        assert_eq!(line_from_stack("    at f (eval_script:7:12)\n    at <eval> (eval_script:9)\n"), Some(7));
        assert_eq!(line_from_stack("    at system (native)\n    at <eval> (eval_script:2)\n"), Some(2));
        assert_eq!(line_from_stack("    at eval_script:2:1\n"), Some(2));
        assert_eq!(line_from_stack("    at eval_script:5\n"), Some(5));
        assert_eq!(line_from_stack("    at system (native)\n"), None);
        assert_eq!(line_from_stack(""), None);
    }
}
