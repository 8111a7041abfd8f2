//! Evaluator port and the sandboxed implementation
//!
//! The build drives an [`Evaluator`] one unit at a time, strictly in
//! evaluation order. The evaluator returns what the unit registered; the
//! driver folds it into the build's [`Registry`]. Panics are caught here,
//! once, and reported with the offending file like any other failure.

pub mod document;
pub mod runtime;
pub mod sandbox;
pub mod value;

pub use document::{ArgValue, Field, OperationType, Selection, VariableDefs};
pub use runtime::{ElementData, GqlRuntime, Model, Operation, RegisteredElement, RegistryDelta, Slice};
pub use value::EvalError;

use crate::error::BuilderError;
use crate::intermediate::IntermediateModule;
use crate::registry::Registry;
use sandbox::Interpreter;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use value::Scope;

/// Runs one synthesized unit against the shared environment.
pub trait Evaluator {
    fn evaluate(&mut self, unit: &IntermediateModule) -> Result<RegistryDelta, EvalError>;
}

/// Tree-walking interpreter with the element-builder runtime preloaded.
///
/// All units of a build share one global scope, so registry accessors in
/// later units see what earlier units registered.
pub struct SandboxEvaluator {
    runtime: GqlRuntime,
    globals: Rc<Scope>,
    max_depth: usize,
}

impl SandboxEvaluator {
    pub fn new(schemas: Vec<String>) -> Self {
        let runtime = GqlRuntime::new(schemas);
        let globals = Scope::root();
        runtime.install(&globals);
        SandboxEvaluator {
            runtime,
            globals,
            max_depth: sandbox::MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Evaluator for SandboxEvaluator {
    fn evaluate(&mut self, unit: &IntermediateModule) -> Result<RegistryDelta, EvalError> {
        let mut interp = Interpreter::new(self.globals.clone()).with_max_depth(self.max_depth);
        match interp.run(&unit.executable) {
            Ok(_) => Ok(self.runtime.take_delta()),
            Err(e) => {
                self.runtime.discard_pending();
                Err(e)
            }
        }
    }
}

/// Evaluate `units` in order, stopping at the first failure.
pub fn evaluate_modules<E: Evaluator + ?Sized>(
    evaluator: &mut E,
    units: &[IntermediateModule],
    registry: &mut Registry,
) -> Result<(), BuilderError> {
    for unit in units {
        tracing::debug!(
            "Evaluating {} ({} element(s))",
            unit.file_path,
            unit.canonical_ids.len()
        );
        let outcome = catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(unit)));
        let delta = match outcome {
            Ok(Ok(delta)) => delta,
            Ok(Err(EvalError::Collision(message))) => {
                return Err(BuilderError::ExportNameCollision(message));
            }
            Ok(Err(e)) => {
                return Err(BuilderError::EvaluationFailed {
                    file: unit.file_path.clone(),
                    message: e.to_string(),
                });
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "evaluator panicked".to_string());
                return Err(BuilderError::EvaluationFailed {
                    file: unit.file_path.clone(),
                    message,
                });
            }
        };
        registry.apply(delta)?;
    }
    Ok(())
}
