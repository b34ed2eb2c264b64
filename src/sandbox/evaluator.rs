//! Script evaluation backends

use super::stand_ins::{StandInMode, StandIns};
use super::{Bindings, ScriptValue};
use crate::error::SigtractError;
use crate::extract::locator::IDENT;
use crate::extract::{DECIPHER_ARGUMENT, DECIPHER_FUNC_NAME, N_ARGUMENT, N_TRANSFORM_FUNC_NAME};
use deno_core::{v8, FastString, JsRuntime, RuntimeOptions};
use regex::Regex;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;
use tracing::debug;

static BINDING_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{IDENT}$")).expect("binding name regex"));

/// Runs an assembled program with named bindings
pub trait Evaluator: Send + Sync {
    /// Run `program` and return the entry point's result, `None` when the
    /// result is null or undefined or no entry point matches the bindings
    fn run(
        &self,
        program: &str,
        bindings: &Bindings,
        mode: StandInMode,
    ) -> Result<Option<ScriptValue>, SigtractError>;
}

/// Sandbox configuration
#[derive(Debug, Clone, Default)]
pub struct SandboxConfig {
    /// Values reported by the browser stand-ins
    pub stand_ins: StandIns,
    /// Terminate a script that runs longer than this
    pub timeout: Option<Duration>,
}

impl SandboxConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_stand_ins(mut self, stand_ins: StandIns) -> Self {
        self.stand_ins = stand_ins;
        self
    }
}

/// Wrap `program` in a function whose parameters are the binding names, in
/// binding order, followed by the entry point dispatch.
pub fn wrap_program(
    program: &str,
    bindings: &Bindings,
    mode: StandInMode,
) -> Result<String, SigtractError> {
    if let Some(name) = bindings.keys().find(|name| !BINDING_NAME.is_match(name)) {
        return Err(SigtractError::InvalidBinding(name.to_string()));
    }

    let params = bindings.keys().collect::<Vec<_>>().join(", ");
    let args = bindings
        .values()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");

    let entry_points = [
        (DECIPHER_ARGUMENT, DECIPHER_FUNC_NAME),
        (N_ARGUMENT, N_TRANSFORM_FUNC_NAME),
    ];

    let wrapped = match mode {
        StandInMode::Full => {
            let dispatch: String = entry_points
                .iter()
                .filter(|(arg, _)| bindings.contains(arg))
                .map(|(arg, func)| {
                    format!(
                        "  if (typeof {func} === 'function') {{\n    return {func}({arg});\n  }}\n"
                    )
                })
                .collect();
            format!("(function ({params}) {{\n{program}\n{dispatch}  return null;\n}})({args});")
        }
        StandInMode::Relaxed => {
            let dispatch: String = entry_points
                .iter()
                .map(|(arg, func)| {
                    format!(
                        "    if (typeof {func} === 'function' && typeof {arg} !== 'undefined') {{\n      return {func}({arg});\n    }}\n"
                    )
                })
                .collect();
            format!(
                "(function ({params}) {{\n  return (function () {{\n{program}\n{dispatch}    return null;\n  }})();\n}})({args});"
            )
        }
    };

    Ok(wrapped)
}

/// V8 evaluator, one fresh isolate per run
#[derive(Debug, Clone, Default)]
pub struct V8Evaluator {
    config: SandboxConfig,
}

impl V8Evaluator {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    fn execute(
        &self,
        runtime: &mut JsRuntime,
        name: &'static str,
        source: String,
    ) -> Result<v8::Global<v8::Value>, SigtractError> {
        let watchdog = self
            .config
            .timeout
            .map(|timeout| Watchdog::arm(runtime.v8_isolate().thread_safe_handle(), timeout));

        let result = runtime.execute_script(name, FastString::from(source));
        let timed_out = watchdog.map(Watchdog::disarm).unwrap_or(false);

        match result {
            Ok(value) => Ok(value),
            Err(_) if timed_out => Err(SigtractError::ScriptTimeout(
                self.config.timeout.unwrap_or_default(),
            )),
            Err(e) => Err(SigtractError::ScriptError(format!("{}: {:?}", name, e))),
        }
    }
}

impl Evaluator for V8Evaluator {
    fn run(
        &self,
        program: &str,
        bindings: &Bindings,
        mode: StandInMode,
    ) -> Result<Option<ScriptValue>, SigtractError> {
        let wrapped = wrap_program(program, bindings, mode)?;
        let prelude = self.config.stand_ins.prelude(mode)?;

        let mut runtime = JsRuntime::new(RuntimeOptions::default());
        self.execute(&mut runtime, "<stand-ins>", prelude)?;
        let value = self.execute(&mut runtime, "<program>", wrapped)?;

        let scope = &mut runtime.handle_scope();
        let local = value.open(scope);
        if local.is_null_or_undefined() {
            debug!("Program returned null or undefined");
            return Ok(None);
        }

        let text = local.to_rust_string_lossy(scope);
        if local.is_string() {
            Ok(Some(ScriptValue::String(text)))
        } else {
            Ok(Some(ScriptValue::Other(text)))
        }
    }
}

/// Terminates the isolate if the script outlives the timeout
struct Watchdog {
    cancel: mpsc::Sender<()>,
    handle: thread::JoinHandle<bool>,
}

impl Watchdog {
    fn arm(isolate: v8::IsolateHandle, timeout: Duration) -> Self {
        let (cancel, rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || match rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                isolate.terminate_execution();
                true
            }
            _ => false,
        });
        Self { cancel, handle }
    }

    /// Returns whether the watchdog fired
    fn disarm(self) -> bool {
        let _ = self.cancel.send(());
        self.handle.join().unwrap_or(false)
    }
}
