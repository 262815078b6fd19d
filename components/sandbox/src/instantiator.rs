//! Executes modules once per run and wires their `require` bindings

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use core_types::{ErrorKind, JsError};
use interpreter::{Control, Interpreter, NativeFn, Scope, Value};
use tracing::debug;

use crate::module::{ModuleRegistry, ModuleState};
use crate::resolver::{ModuleError, Resolver};

/// Loads modules from a source table, memoizing each by filename
///
/// Shared through an `Rc` because every module's `require` function holds
/// a handle back to the loader.
#[derive(Debug)]
pub struct Instantiator {
    resolver: Resolver,
    registry: RefCell<ModuleRegistry>,
}

impl Instantiator {
    /// Loader with an empty registry
    pub fn new(resolver: Resolver) -> Rc<Self> {
        Rc::new(Self {
            resolver,
            registry: RefCell::new(ModuleRegistry::new()),
        })
    }

    /// Records of every module referenced so far
    pub fn registry(&self) -> Ref<'_, ModuleRegistry> {
        self.registry.borrow()
    }

    /// Resolve `specifier` relative to `from` and instantiate the result
    pub fn require(self: &Rc<Self>, interp: &mut Interpreter, specifier: &str, from: Option<&str>) -> Result<Value, Control> {
        let filename = self
            .resolver
            .resolve(specifier, from)
            .map_err(|error| throw_module_error(interp, error))?;
        debug!(specifier, from, filename = %filename, "resolved module");
        self.instantiate(interp, &filename)
    }

    /// Exported value of `filename`, executing it on first use
    ///
    /// A module that is still executing yields a `CircularRequireError`;
    /// a module that failed re-raises its original failure.
    #[tracing::instrument(level = "debug", skip(self, interp))]
    pub fn instantiate(self: &Rc<Self>, interp: &mut Interpreter, filename: &str) -> Result<Value, Control> {
        let state = self.registry.borrow_mut().entry(filename).state.clone();
        match state {
            ModuleState::Instantiated(exports) => return Ok(exports),
            ModuleState::Failed(control) => return Err(control),
            ModuleState::Instantiating => {
                let chain = self.registry.borrow().cycle_to(filename);
                debug!(?chain, "circular require");
                return Err(throw_module_error(interp, ModuleError::CircularRequire { chain }));
            }
            ModuleState::Pending => {}
        }

        self.registry.borrow_mut().begin(filename);
        let outcome = self.execute(interp, filename);
        self.registry.borrow_mut().finish(filename, &outcome);
        debug!(ok = outcome.is_ok(), "module finished");
        outcome
    }

    fn execute(self: &Rc<Self>, interp: &mut Interpreter, filename: &str) -> Result<Value, Control> {
        let source = match self.resolver.sources().source(filename) {
            Some(source) => source,
            None => {
                let error = ModuleError::ModuleNotFound {
                    specifier: filename.to_string(),
                    from: None,
                };
                return Err(throw_module_error(interp, error));
            }
        };
        let program = parser::parse(&source).map_err(|error| syntax_error(interp, filename, &error))?;

        let exports = Value::Object(interp.realm.new_object());
        let module = interp.realm.new_object();
        module.put("id", Value::from(filename));
        module.put("exports", exports.clone());

        let scope = Scope::function(interp.realm.global(), Some(exports.clone()));
        scope.define("require", Value::Object(self.require_function(interp, filename)));
        scope.define("module", Value::Object(module.clone()));
        scope.define("exports", exports);
        scope.define("__filename", Value::from(filename));

        interp.run_program(&program, &scope)?;
        Ok(module.get("exports"))
    }

    fn require_function(self: &Rc<Self>, interp: &Interpreter, filename: &str) -> interpreter::ObjectRef {
        let loader = Rc::clone(self);
        let from = filename.to_string();
        let func: NativeFn = Rc::new(move |interp: &mut Interpreter, _this: Value, args: &[Value]| -> Result<Value, Control> {
            match args.first() {
                Some(Value::String(specifier)) => loader.require(interp, specifier, Some(&from)),
                other => {
                    let received = interp.describe(other.unwrap_or(&Value::Undefined));
                    Err(interp.type_error(format!("require() expects a string specifier, received {}", received)))
                }
            }
        });
        interp.realm.new_native_function("require", 1, func)
    }
}

/// Throw carrying `error` as the host payload of a named error object
pub fn throw_module_error(interp: &Interpreter, error: ModuleError) -> Control {
    let message = error.to_string();
    let object = interp.realm.new_custom_error(error.name(), &message, Some(Rc::new(error)));
    Control::Throw(Value::Object(object))
}

/// The module error a thrown value carries, if the loader raised it
pub fn module_error(value: &Value) -> Option<ModuleError> {
    let payload = value.as_object()?.error_payload()?;
    (*payload).downcast_ref::<ModuleError>().cloned()
}

fn syntax_error(interp: &Interpreter, filename: &str, error: &JsError) -> Control {
    let message = match &error.source_position {
        Some(position) => format!("{} ({}:{})", error.message, filename, position),
        None => format!("{} ({})", error.message, filename),
    };
    interp.throw_error(ErrorKind::SyntaxError, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_set::SourceSet;

    fn load(files: &[(&str, &str)], entry: &str) -> Result<String, String> {
        let mut interp = Interpreter::new();
        builtins::install(&mut interp);
        let sources: SourceSet = files.iter().copied().collect();
        let loader = Instantiator::new(Resolver::new(sources));
        match loader.require(&mut interp, entry, None) {
            Ok(value) => Ok(builtins::display(&value)),
            Err(Control::Throw(value)) => Err(builtins::describe_thrown(&value)),
            Err(Control::Halt(halt)) => Err(halt.to_string()),
        }
    }

    #[test]
    fn test_module_exports_and_exports_alias() {
        let files = [
            ("main.js", "const a = require('a.js'); const b = require('b.js'); module.exports = [a.x, b.y, typeof require('c.js')].join()"),
            ("a.js", "exports.x = 1"),
            ("b.js", "module.exports = { y: 2 }"),
            ("c.js", "exports = 5"),
        ];
        assert_eq!(load(&files, "main.js").unwrap(), "1,2,object");
    }

    #[test]
    fn test_each_module_runs_once() {
        let files = [
            ("main.js", "require('a.js'); require('b.js'); module.exports = require('state.js').loads + ':' + (require('a.js') === require('a.js'))"),
            ("a.js", "require('counted.js'); module.exports = {}"),
            ("b.js", "require('./counted.js')"),
            ("counted.js", "require('state.js').loads++"),
            ("state.js", "module.exports = { loads: 0 }"),
        ];
        assert_eq!(load(&files, "main.js").unwrap(), "1:true");
    }

    #[test]
    fn test_missing_module_is_catchable() {
        let files = [(
            "main.js",
            "let caught; try { require('nope.js') } catch (e) { caught = e.name + ': ' + e.message } module.exports = caught",
        )];
        assert_eq!(
            load(&files, "main.js").unwrap(),
            "ModuleNotFoundError: Cannot find module 'nope.js' from 'main.js'"
        );
    }

    #[test]
    fn test_loader_errors_carry_payload() {
        let mut interp = Interpreter::new();
        let loader = Instantiator::new(Resolver::new(SourceSet::new()));
        let control = loader.require(&mut interp, "gone.js", Some("main.js")).unwrap_err();
        let error = module_error(control.thrown().unwrap()).unwrap();
        assert_eq!(
            error,
            ModuleError::ModuleNotFound {
                specifier: "gone.js".to_string(),
                from: Some("main.js".to_string()),
            }
        );
        assert!(module_error(&Value::from("gone.js")).is_none());
    }

    #[test]
    fn test_circular_require() {
        let files = [("a.js", "require('b.js')"), ("b.js", "require('a.js')")];
        assert_eq!(
            load(&files, "a.js").unwrap_err(),
            "CircularRequireError: Circular require detected: a.js -> b.js -> a.js"
        );
    }

    #[test]
    fn test_failure_is_cached_and_reraised() {
        let files = [
            ("main.js", "const seen = []; for (let i = 0; i < 2; i++) { try { require('bad.js') } catch (e) { seen.push(e.message) } } module.exports = seen.join('|') + '|' + require('state.js').runs"),
            ("bad.js", "require('state.js').runs++; throw new Error('broken')"),
            ("state.js", "module.exports = { runs: 0 }"),
        ];
        assert_eq!(load(&files, "main.js").unwrap(), "broken|broken|1");
    }

    #[test]
    fn test_syntax_error_names_the_file() {
        let files = [("main.js", "require('broken.js')"), ("broken.js", "const value = ;")];
        let error = load(&files, "main.js").unwrap_err();
        assert!(error.starts_with("SyntaxError: "), "{}", error);
        assert!(error.contains("(broken.js:1:"), "{}", error);
    }

    #[test]
    fn test_scope_bindings() {
        let files = [(
            "lib/x.js",
            "module.exports = [__filename, module.id, this === exports, typeof require].join()",
        )];
        assert_eq!(load(&files, "lib/x.js").unwrap(), "lib/x.js,lib/x.js,true,function");
    }

    #[test]
    fn test_require_rejects_non_strings() {
        let files = [("main.js", "let m; try { require(42) } catch (e) { m = e.name } module.exports = m")];
        assert_eq!(load(&files, "main.js").unwrap(), "TypeError");
    }

    #[test]
    fn test_modules_do_not_share_scope() {
        let files = [
            ("main.js", "const secret = 1; module.exports = require('peek.js')"),
            ("peek.js", "module.exports = typeof secret"),
        ];
        assert_eq!(load(&files, "main.js").unwrap(), "undefined");
    }
}
