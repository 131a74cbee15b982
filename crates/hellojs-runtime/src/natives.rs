//! Native functions
//!
//! `rand`, `srand` and `system`, passed straight through to the C library.
//! The C PRNG is process-wide state; scripts run on one thread, so calls are
//! already serialized.

use crate::{CallArgs, JsValue, NativeBinding, NativeError};
use std::ffi::CString;
use std::os::raw::c_int;

/// The functions installed into every script's global scope
pub fn host_functions() -> Vec<NativeBinding> {
    vec![
        NativeBinding::new("rand", 0, rand),
        NativeBinding::new("srand", 1, srand),
        NativeBinding::new("system", 1, system),
    ]
}

/// `rand()` - next value of the C PRNG, as a number
pub fn rand(_args: &dyn CallArgs) -> Result<JsValue, NativeError> {
    // SAFETY: rand() has no preconditions.
    let value = unsafe { libc::rand() };
    tracing::trace!(value, "rand()");
    Ok(JsValue::Number(f64::from(value)))
}

/// `srand(seed)` - reseed the C PRNG
pub fn srand(args: &dyn CallArgs) -> Result<JsValue, NativeError> {
    let number = args.number(0)?;
    let seed = seed_from_number(number)
        .ok_or_else(|| NativeError::Type(format!("srand: seed must be a finite number, got {number}")))?;

    tracing::trace!(seed, "srand()");
    // SAFETY: srand() has no preconditions.
    unsafe { libc::srand(seed) };
    Ok(JsValue::Undefined)
}

/// `system(cmd)` - run `cmd` with the C library's command processor
pub fn system(args: &dyn CallArgs) -> Result<JsValue, NativeError> {
    let command = args.string(0)?;
    let command = CString::new(command)
        .map_err(|_| NativeError::Type("system: command must not contain NUL characters".to_string()))?;

    tracing::debug!(command = %command.to_string_lossy(), "system()");
    // SAFETY: `command` is a valid NUL-terminated string that outlives the call.
    let status = unsafe { libc::system(command.as_ptr()) };

    if status != 0 {
        let code = exit_code(status);
        tracing::debug!(status, code, "command failed");
        return Err(NativeError::Failed(format!("Command failed with status code {code}")));
    }
    Ok(JsValue::Undefined)
}

/// ToUint64 truncated to 32 bits, or `None` for NaN and infinities.
///
/// The low 32 bits of ToUint64 are the value modulo 2^32, computed exactly
/// in f64.
fn seed_from_number(number: f64) -> Option<u32> {
    if !number.is_finite() {
        return None;
    }
    Some(number.trunc().rem_euclid(4_294_967_296.0) as u32)
}

#[cfg(unix)]
fn exit_code(status: c_int) -> c_int {
    if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else {
        status
    }
}

#[cfg(not(unix))]
fn exit_code(status: c_int) -> c_int {
    status
}
