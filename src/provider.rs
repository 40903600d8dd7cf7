use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Context key the form store publishes itself under.
pub const FORM_CONTEXT: &str = "form";

/// Context key the wizard store publishes itself under.
pub const WIZARD_CONTEXT: &str = "wizard";

/// Per-tree dependency scope. Ancestors publish stores under fixed string
/// keys and descendants look them up through the same scope handle, instead
/// of threading every store through constructor arguments or reaching for
/// process-global state.
#[derive(Clone, Default)]
pub struct ContextScope {
    entries: Arc<RwLock<BTreeMap<&'static str, Arc<dyn Any + Send + Sync>>>>,
}

impl ContextScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `value` under `key`, replacing any previous entry.
    pub fn set_context<T>(&self, key: &'static str, value: T)
    where
        T: Send + Sync + 'static,
    {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(key, Arc::new(value));
    }

    /// Retrieves the entry published under `key`, if one of the right type
    /// is present.
    pub fn get_context<T>(&self, key: &'static str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(key)
            .and_then(|entry| entry.downcast_ref::<T>())
            .cloned()
    }
}
