use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::provider::{ContextScope, WIZARD_CONTEXT};
use crate::store::{FormResult, SubscriptionId, read_lock, write_lock};
use crate::value::Value;

pub type WizardSubscriber = Arc<dyn Fn(&BTreeMap<String, Value>) + Send + Sync>;

/// Keyed scratch values carried across the steps of a multi-step flow. No
/// validation involved; it only shares the form store's subscribe/set/update
/// surface and context registration.
#[derive(Clone, Default)]
pub struct WizardStore {
    state: Arc<RwLock<BTreeMap<String, Value>>>,
    subscribers: Arc<RwLock<BTreeMap<SubscriptionId, WizardSubscriber>>>,
}

impl WizardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store and publishes it in `scope` under [`WIZARD_CONTEXT`].
    pub fn create(scope: &ContextScope) -> Self {
        let store = Self::new();
        scope.set_context(WIZARD_CONTEXT, store.clone());
        store
    }

    pub fn snapshot(&self) -> FormResult<BTreeMap<String, Value>> {
        Ok(read_lock(&self.state, "creating wizard snapshot")?.clone())
    }

    pub fn get(&self, name: &str) -> FormResult<Option<Value>> {
        Ok(read_lock(&self.state, "reading wizard value")?
            .get(name)
            .cloned())
    }

    pub fn insert(&self, name: impl Into<String>, value: impl Into<Value>) -> FormResult<()> {
        self.update(|values| {
            values.insert(name.into(), value.into());
        })
    }

    pub fn set(&self, next: BTreeMap<String, Value>) -> FormResult<()> {
        let snapshot = {
            let mut state = write_lock(&self.state, "replacing wizard state")?;
            *state = next;
            state.clone()
        };
        self.notify(&snapshot)
    }

    pub fn update(
        &self,
        updater: impl FnOnce(&mut BTreeMap<String, Value>),
    ) -> FormResult<()> {
        let snapshot = {
            let mut state = write_lock(&self.state, "updating wizard state")?;
            updater(&mut *state);
            state.clone()
        };
        self.notify(&snapshot)
    }

    /// The new subscriber immediately observes the current values, then
    /// every committed change until unsubscribed.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&BTreeMap<String, Value>) + Send + Sync + 'static,
    ) -> FormResult<SubscriptionId> {
        let id = SubscriptionId::next();
        let subscriber: WizardSubscriber = Arc::new(subscriber);
        let current = self.snapshot()?;
        subscriber(&current);
        write_lock(&self.subscribers, "adding wizard subscriber")?.insert(id, subscriber);
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> FormResult<()> {
        write_lock(&self.subscribers, "removing wizard subscriber")?.remove(&id);
        Ok(())
    }

    fn notify(&self, state: &BTreeMap<String, Value>) -> FormResult<()> {
        let subscribers = read_lock(&self.subscribers, "notifying wizard subscribers")?
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for subscriber in subscribers {
            subscriber(state);
        }
        Ok(())
    }
}

/// Looks up the enclosing wizard store previously published via
/// [`WizardStore::create`].
pub fn wizard_store(scope: &ContextScope) -> Option<WizardStore> {
    scope.get_context(WIZARD_CONTEXT)
}
