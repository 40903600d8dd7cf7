use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future;

use crate::provider::{ContextScope, FORM_CONTEXT};
use crate::validation::{RunHandle, Validations};
use crate::validators::{MIN_LENGTH_KEY, REQUIRED_KEY, min_length_validation, required_validation};
use crate::value::Value;

static SUBSCRIPTION_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionId(pub u64);

impl SubscriptionId {
    pub fn next() -> Self {
        Self(SUBSCRIPTION_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

/// Outcome of a settled validation run. Only `Error` is ever committed to
/// the store; `Aborted` is the sentinel a superseded run resolves with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Feedback {
    Error { message: String },
    Aborted,
}

impl Feedback {
    pub(crate) fn error(message: impl Into<String>) -> Self {
        Feedback::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Feedback::Error { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Feedback::Aborted)
    }

    pub fn message(&self) -> &str {
        match self {
            Feedback::Error { message } => message,
            Feedback::Aborted => "Validation was aborted",
        }
    }
}

pub(crate) const DEFAULT_LABEL: &str = "Field";

/// One named input's value plus its validation state.
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub value: Value,
    pub required: bool,
    pub min_length: Option<usize>,
    pub label: Option<String>,
    pub is_validating: bool,
    pub is_focused: bool,
    pub is_valid: bool,
    pub feedback: Option<Feedback>,
    // Fixed at registration time; runs in insertion order.
    pub(crate) validations: Validations,
}

impl Field {
    /// Label used in validator messages.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn validation_keys(&self) -> impl Iterator<Item = &str> {
        self.validations.keys()
    }
}

/// Registration arguments for [`FormStore::register_field`].
#[derive(Clone, Default)]
pub struct FieldOptions {
    pub name: String,
    pub value: Value,
    pub required: bool,
    pub label: Option<String>,
    pub min_length: Option<usize>,
    pub validations: Validations,
}

impl FieldOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    pub fn label(mut self, value: impl Into<String>) -> Self {
        self.label = Some(value.into());
        self
    }

    pub fn min_length(mut self, value: usize) -> Self {
        self.min_length = Some(value);
        self
    }

    pub fn validation(
        mut self,
        key: impl Into<String>,
        validator: crate::validation::ValidatorFn,
    ) -> Self {
        self.validations.insert(key, validator);
        self
    }
}

/// The externally observed form state.
#[derive(Clone, Default)]
pub struct FormState {
    pub is_submitting: bool,
    pub is_valid: bool,
    pub fields: BTreeMap<String, Field>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    UnknownField(String),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::UnknownField(name) => {
                write!(f, "field {name:?} is not registered")
            }
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub type Subscriber = Arc<dyn Fn(&FormState) + Send + Sync>;

/// Reactive form container: field registry, validation entry points, and a
/// subscribe/set/update store surface.
#[derive(Clone)]
pub struct FormStore {
    pub(crate) state: Arc<RwLock<FormState>>,
    pub(crate) runs: Arc<RwLock<BTreeMap<String, RunHandle>>>,
    initial_values: Arc<BTreeMap<String, Value>>,
    subscribers: Arc<RwLock<BTreeMap<SubscriptionId, Subscriber>>>,
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FormStore {
    pub fn new() -> Self {
        Self::with_initial_values(BTreeMap::new())
    }

    pub fn with_initial_values(initial_values: BTreeMap<String, Value>) -> Self {
        Self {
            state: Arc::new(RwLock::new(FormState::default())),
            runs: Arc::new(RwLock::new(BTreeMap::new())),
            initial_values: Arc::new(initial_values),
            subscribers: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Builds a store and publishes it in `scope` under [`FORM_CONTEXT`],
    /// where nested field components can look it up.
    pub fn create(scope: &ContextScope, initial_values: BTreeMap<String, Value>) -> Self {
        let store = Self::with_initial_values(initial_values);
        scope.set_context(FORM_CONTEXT, store.clone());
        store
    }

    pub fn snapshot(&self) -> FormResult<FormState> {
        Ok(read_lock(&self.state, "creating form snapshot")?.clone())
    }

    /// The new subscriber immediately observes the current state, then every
    /// committed change until unsubscribed.
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&FormState) + Send + Sync + 'static,
    ) -> FormResult<SubscriptionId> {
        let id = SubscriptionId::next();
        let subscriber: Subscriber = Arc::new(subscriber);
        let current = self.snapshot()?;
        subscriber(&current);
        write_lock(&self.subscribers, "adding subscriber")?.insert(id, subscriber);
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> FormResult<()> {
        write_lock(&self.subscribers, "removing subscriber")?.remove(&id);
        Ok(())
    }

    /// Full state replacement. Run handles for in-flight validations are left
    /// alone; their commits no-op if their field vanished.
    pub fn set(&self, next: FormState) -> FormResult<()> {
        let snapshot = {
            let mut state = write_lock(&self.state, "replacing form state")?;
            *state = next;
            state.clone()
        };
        self.notify(&snapshot)
    }

    /// Derives the next state from the latest one under the write lock.
    pub fn update(&self, updater: impl FnOnce(&mut FormState)) -> FormResult<()> {
        let snapshot = {
            let mut state = write_lock(&self.state, "updating form state")?;
            updater(&mut *state);
            state.clone()
        };
        self.notify(&snapshot)
    }

    /// Registers (or re-registers) a field. Built-in validators derived from
    /// `required`/`min_length` are composed with the caller's; a caller entry
    /// sharing a built-in key overrides it. The value is seeded from the
    /// store's initial-values table when present, and a truthy seed triggers
    /// an immediate validation pass.
    pub async fn register_field(&self, options: FieldOptions) -> FormResult<()> {
        let FieldOptions {
            name,
            value,
            required,
            label,
            min_length,
            validations,
        } = options;

        let mut composed = Validations::new();
        if required {
            composed.insert(REQUIRED_KEY, required_validation());
        }
        if min_length.is_some() {
            composed.insert(MIN_LENGTH_KEY, min_length_validation());
        }
        composed.merge(validations);

        let seeded = self
            .initial_values
            .get(&name)
            .cloned()
            .unwrap_or(value);
        let should_validate = seeded.is_truthy();

        let field = Field {
            name: name.clone(),
            value: seeded,
            required,
            min_length,
            label,
            is_validating: false,
            is_focused: false,
            // A field with no validators is valid from the start.
            is_valid: composed.is_empty(),
            feedback: None,
            validations: composed,
        };

        self.update(|state| {
            state.fields.insert(field.name.clone(), field);
        })?;

        if should_validate {
            self.validate_field(&name).await?;
        }
        Ok(())
    }

    /// Removes a field and its run handle. Dropping the handle resolves any
    /// in-flight validation as aborted. No-op when the field is absent.
    pub fn remove_field(&self, name: &str) -> FormResult<()> {
        let snapshot = {
            let mut state = write_lock(&self.state, "removing field")?;
            let mut runs = write_lock(&self.runs, "dropping field run handle")?;
            if state.fields.remove(name).is_none() {
                return Ok(());
            }
            runs.remove(name);
            state.is_valid = state.fields.values().all(|field| field.is_valid);
            state.clone()
        };
        self.notify(&snapshot)
    }

    /// Applies a partial update to a field's state. Never triggers
    /// validation; callers decide when to revalidate.
    pub fn update_field(
        &self,
        name: &str,
        apply: impl FnOnce(&mut Field),
    ) -> FormResult<()> {
        let snapshot = {
            let mut state = write_lock(&self.state, "updating field")?;
            let field = state
                .fields
                .get_mut(name)
                .ok_or_else(|| FormError::UnknownField(name.to_owned()))?;
            apply(field);
            state.clone()
        };
        self.notify(&snapshot)
    }

    /// Snapshot of every field's current value. No validation side effects.
    pub fn values(&self) -> FormResult<BTreeMap<String, Value>> {
        let state = read_lock(&self.state, "reading field values")?;
        Ok(state
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect())
    }

    /// Validates every registered field concurrently and resolves with the
    /// collected values once all runs settle, regardless of validity.
    /// Callers check `is_valid` separately.
    pub async fn submit(&self) -> FormResult<BTreeMap<String, Value>> {
        self.update(|state| state.is_submitting = true)?;

        let names = read_lock(&self.state, "listing fields for submit")?
            .fields
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        let results =
            future::join_all(names.iter().map(|name| self.validate_field(name))).await;
        self.update(|state| state.is_submitting = false)?;
        for result in results {
            match result {
                // The field was removed while the submit was in flight.
                Err(FormError::UnknownField(_)) => {}
                other => other?,
            }
        }

        self.values()
    }

    pub(crate) fn notify(&self, state: &FormState) -> FormResult<()> {
        let subscribers = read_lock(&self.subscribers, "notifying subscribers")?
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for subscriber in subscribers {
            subscriber(state);
        }
        Ok(())
    }
}

/// Looks up the enclosing form store previously published via
/// [`FormStore::create`].
pub fn form_store(scope: &ContextScope) -> Option<FormStore> {
    scope.get_context(FORM_CONTEXT)
}

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
