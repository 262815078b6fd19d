//! Per-run bookkeeping of module instantiation

use std::collections::HashMap;

use interpreter::{Control, Value};

/// Lifecycle of one module within a run
#[derive(Debug, Clone)]
pub enum ModuleState {
    /// Referenced but not yet executing
    Pending,
    /// Top-level code is running
    Instantiating,
    /// Finished; holds the final `module.exports`
    Instantiated(Value),
    /// Top-level code failed; the failure is re-raised to every requester
    Failed(Control),
}

impl ModuleState {
    /// Short state name for logs
    pub fn label(&self) -> &'static str {
        match self {
            ModuleState::Pending => "pending",
            ModuleState::Instantiating => "instantiating",
            ModuleState::Instantiated(_) => "instantiated",
            ModuleState::Failed(_) => "failed",
        }
    }
}

/// One distinct filename resolved during a run
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Key in the source table
    pub filename: String,
    /// Current lifecycle state
    pub state: ModuleState,
}

impl ModuleRecord {
    /// Exported value, present once instantiated
    pub fn exports(&self) -> Option<&Value> {
        match &self.state {
            ModuleState::Instantiated(value) => Some(value),
            _ => None,
        }
    }

    /// Cached failure, present once failed
    pub fn error(&self) -> Option<&Control> {
        match &self.state {
            ModuleState::Failed(control) => Some(control),
            _ => None,
        }
    }
}

/// Module records of one run, plus the chain of modules currently executing
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    records: HashMap<String, ModuleRecord>,
    loading: Vec<String>,
}

impl ModuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `filename`
    pub fn get(&self, filename: &str) -> Option<&ModuleRecord> {
        self.records.get(filename)
    }

    /// Record for `filename`, created `Pending` on first reference
    pub fn entry(&mut self, filename: &str) -> &mut ModuleRecord {
        self.records.entry(filename.to_string()).or_insert_with(|| ModuleRecord {
            filename: filename.to_string(),
            state: ModuleState::Pending,
        })
    }

    /// Mark `filename` as executing and push it on the loading chain
    pub fn begin(&mut self, filename: &str) {
        self.entry(filename).state = ModuleState::Instantiating;
        self.loading.push(filename.to_string());
    }

    /// Store the outcome of executing `filename` and pop it off the loading chain
    pub fn finish(&mut self, filename: &str, outcome: &Result<Value, Control>) {
        self.entry(filename).state = match outcome {
            Ok(exports) => ModuleState::Instantiated(exports.clone()),
            Err(control) => ModuleState::Failed(control.clone()),
        };
        if let Some(position) = self.loading.iter().rposition(|name| name == filename) {
            self.loading.remove(position);
        }
    }

    /// The cycle closed by requiring `filename` while it is still executing
    pub fn cycle_to(&self, filename: &str) -> Vec<String> {
        let start = self.loading.iter().position(|name| name == filename).unwrap_or(0);
        let mut chain: Vec<String> = self.loading[start..].to_vec();
        chain.push(filename.to_string());
        chain
    }

    /// Number of distinct modules referenced so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no module has been referenced
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut registry = ModuleRegistry::new();
        assert!(matches!(registry.entry("a.js").state, ModuleState::Pending));

        registry.begin("a.js");
        assert_eq!(registry.get("a.js").map(|r| r.state.label()), Some("instantiating"));

        registry.finish("a.js", &Ok(Value::Number(1.0)));
        let record = registry.get("a.js").unwrap();
        assert_eq!(record.exports(), Some(&Value::Number(1.0)));
        assert!(record.error().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failure_is_cached() {
        let mut registry = ModuleRegistry::new();
        registry.begin("bad.js");
        registry.finish("bad.js", &Err(Control::Throw(Value::from("boom"))));
        let record = registry.get("bad.js").unwrap();
        assert_eq!(record.error().and_then(Control::thrown), Some(&Value::from("boom")));
        assert!(record.exports().is_none());
    }

    #[test]
    fn test_cycle_chain() {
        let mut registry = ModuleRegistry::new();
        registry.begin("index.test.js");
        registry.begin("a.js");
        registry.begin("b.js");
        assert_eq!(registry.cycle_to("a.js"), vec!["a.js", "b.js", "a.js"]);

        registry.finish("b.js", &Ok(Value::Undefined));
        assert_eq!(registry.cycle_to("index.test.js"), vec!["index.test.js", "a.js", "index.test.js"]);
    }
}
