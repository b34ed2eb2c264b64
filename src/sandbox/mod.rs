//! Isolated evaluation of assembled programs
//!
//! Every run gets a fresh context, so nothing leaks between evaluations.
//! Failures never propagate: a program that throws under the full set of
//! browser stand-ins is retried once under the relaxed set, and a second
//! failure is logged and reported as an absent result.

pub mod evaluator;
pub mod stand_ins;

pub use evaluator::{wrap_program, Evaluator, SandboxConfig, V8Evaluator};
pub use stand_ins::{StandInMode, StandIns};

use crate::extract::strip_short_circuits;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Named values exposed to a program, in binding order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing an earlier value under the same name
    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// String forms of falsy non-string values
const FALSY_FORMS: &[&str] = &["undefined", "null", "0", "false", "NaN"];

/// Result of a program run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptValue {
    String(String),
    /// Any other value, in its string form
    Other(String),
}

impl ScriptValue {
    pub fn as_str(&self) -> &str {
        match self {
            ScriptValue::String(s) | ScriptValue::Other(s) => s,
        }
    }

    /// String result, with truthy non-string values coerced to their string
    /// form
    pub fn into_coerced(self) -> Option<String> {
        match self {
            ScriptValue::String(s) => Some(s),
            ScriptValue::Other(s) if FALSY_FORMS.contains(&s.as_str()) => None,
            ScriptValue::Other(s) => Some(s),
        }
    }
}

/// Soft-failing program executor
#[derive(Clone)]
pub struct Sandbox {
    evaluator: Arc<dyn Evaluator>,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox").finish_non_exhaustive()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

impl Sandbox {
    /// Sandbox backed by V8
    pub fn new(config: SandboxConfig) -> Self {
        Self::with_evaluator(Arc::new(V8Evaluator::new(config)))
    }

    pub fn with_evaluator(evaluator: Arc<dyn Evaluator>) -> Self {
        Self { evaluator }
    }

    /// Run `program` with `bindings`. Returns `None` when the program yields
    /// null or undefined, has no matching entry point, or fails twice.
    pub fn execute(&self, program: &str, bindings: &Bindings) -> Option<ScriptValue> {
        let program = strip_short_circuits(program);

        match self.evaluator.run(&program, bindings, StandInMode::Full) {
            Ok(value) => return value,
            Err(e) => warn!("Evaluation failed, retrying with relaxed stand-ins: {}", e),
        }

        match self.evaluator.run(&program, bindings, StandInMode::Relaxed) {
            Ok(value) => {
                debug!("Relaxed evaluation succeeded");
                value
            }
            Err(e) => {
                error!("Evaluation failed with relaxed stand-ins: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SigtractError;
    use std::sync::Mutex;

    /// Records the modes it ran under and fails under the listed ones
    struct ScriptedEvaluator {
        fail_in: Vec<StandInMode>,
        calls: Mutex<Vec<(String, StandInMode)>>,
    }

    impl ScriptedEvaluator {
        fn new(fail_in: Vec<StandInMode>) -> Arc<Self> {
            Arc::new(Self {
                fail_in,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl Evaluator for ScriptedEvaluator {
        fn run(
            &self,
            program: &str,
            _bindings: &Bindings,
            mode: StandInMode,
        ) -> Result<Option<ScriptValue>, SigtractError> {
            self.calls.lock().unwrap().push((program.to_string(), mode));
            if self.fail_in.contains(&mode) {
                Err(SigtractError::ScriptError("boom".to_string()))
            } else {
                Ok(Some(ScriptValue::String(format!("{:?}", mode))))
            }
        }
    }

    #[test]
    fn test_bindings_order_and_replace() {
        let bindings = Bindings::new().bind("sig", "a").bind("ncode", "b").bind("sig", "c");
        assert_eq!(bindings.keys().collect::<Vec<_>>(), vec!["sig", "ncode"]);
        assert_eq!(
            bindings.values().cloned().collect::<Vec<_>>(),
            vec![Value::from("c"), Value::from("b")]
        );
        assert!(bindings.contains("ncode"));
        assert_eq!(bindings.get("sig"), Some(&Value::from("c")));
        assert!(!bindings.contains("n"));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(ScriptValue::String("null".into()).into_coerced(), Some("null".into()));
        assert_eq!(ScriptValue::Other("null".into()).into_coerced(), None);
        assert_eq!(ScriptValue::Other("undefined".into()).into_coerced(), None);
        assert_eq!(ScriptValue::Other("42".into()).into_coerced(), Some("42".into()));
        assert_eq!(ScriptValue::Other("true".into()).into_coerced(), Some("true".into()));
        for falsy in ["0", "false", "NaN"] {
            assert_eq!(ScriptValue::Other(falsy.into()).into_coerced(), None);
        }
        assert_eq!(ScriptValue::String("0".into()).into_coerced(), Some("0".into()));
    }

    #[test]
    fn test_full_mode_first() {
        let evaluator = ScriptedEvaluator::new(vec![]);
        let sandbox = Sandbox::with_evaluator(evaluator.clone());
        let value = sandbox.execute("x", &Bindings::new().bind("sig", "a"));
        assert_eq!(value, Some(ScriptValue::String("Full".into())));
        assert_eq!(evaluator.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_relaxed_retry() {
        let evaluator = ScriptedEvaluator::new(vec![StandInMode::Full]);
        let sandbox = Sandbox::with_evaluator(evaluator.clone());
        let value = sandbox.execute("x", &Bindings::new().bind("sig", "a"));
        assert_eq!(value, Some(ScriptValue::String("Relaxed".into())));

        let modes: Vec<_> = evaluator.calls.lock().unwrap().iter().map(|c| c.1).collect();
        assert_eq!(modes, vec![StandInMode::Full, StandInMode::Relaxed]);
    }

    #[test]
    fn test_double_failure_is_absent() {
        let evaluator = ScriptedEvaluator::new(vec![StandInMode::Full, StandInMode::Relaxed]);
        let sandbox = Sandbox::with_evaluator(evaluator);
        assert_eq!(sandbox.execute("x", &Bindings::new()), None);
    }

    #[test]
    fn test_guards_stripped_before_run() {
        let evaluator = ScriptedEvaluator::new(vec![]);
        let sandbox = Sandbox::with_evaluator(evaluator.clone());
        sandbox.execute(
            "var a=1;if(typeof b===\"undefined\")return a;a++",
            &Bindings::new(),
        );
        let calls = evaluator.calls.lock().unwrap();
        assert!(!calls[0].0.contains("typeof b"));
    }

    #[test]
    fn test_v8_decipher_reverses() {
        let program = "var Xy={rev:function(a){a.reverse()}};\nfunction SigtractDecipherFunc(a){a=a.split(\"\");Xy.rev(a);return a.join(\"\")}\nSigtractDecipherFunc(sig);";
        let value = Sandbox::default().execute(program, &Bindings::new().bind("sig", "abcd"));
        assert_eq!(value, Some(ScriptValue::String("dcba".into())));
    }

    #[test]
    fn test_v8_guard_does_not_short_circuit() {
        let program = "function SigtractNTransformFunc(a){var b=a.split(\"\");if(typeof q===\"undefined\")return a;b.reverse();return b.join(\"\")}";
        let value = Sandbox::default().execute(program, &Bindings::new().bind("ncode", "xyz"));
        assert_eq!(value, Some(ScriptValue::String("zyx".into())));
    }

    #[test]
    fn test_v8_missing_entry_point() {
        let value = Sandbox::default().execute("var a=1;", &Bindings::new().bind("sig", "abcd"));
        assert_eq!(value, None);
    }

    #[test]
    fn test_v8_throwing_program() {
        let program = "function SigtractDecipherFunc(a){throw new Error('x')}";
        assert_eq!(Sandbox::default().execute(program, &Bindings::new().bind("sig", "a")), None);
    }
}
