use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::channel::oneshot;
use futures::future::{self, Either};

use crate::store::{Feedback, Field, FormError, FormResult, FormStore, write_lock};

static VALIDATION_TICKET_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

/// Monotonic run counter. Only the run holding the latest ticket may commit
/// its outcome. Tickets come from a process-wide allocator and are never
/// reissued, so a run that outlives its handle cannot collide with a later
/// run's ticket.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

impl ValidationTicket {
    pub fn next() -> Self {
        Self(VALIDATION_TICKET_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

/// Live handle for a field's in-flight validation run. Dropping or firing
/// the abort sender resolves that run as aborted.
pub(crate) struct RunHandle {
    pub(crate) ticket: ValidationTicket,
    pub(crate) abort: oneshot::Sender<()>,
}

pub type BoxedValidationFuture = Pin<Box<dyn Future<Output = Option<String>> + Send + 'static>>;

/// The validator plug-in contract: a function over the field's state that
/// yields `None` to pass or a failure message. Receives a snapshot of the
/// field taken when the run started.
pub type ValidatorFn = Arc<dyn Fn(Field) -> BoxedValidationFuture + Send + Sync>;

/// Lifts a synchronous predicate into the validator contract.
pub fn validator<F>(func: F) -> ValidatorFn
where
    F: Fn(&Field) -> Option<String> + Send + Sync + 'static,
{
    Arc::new(move |field: Field| {
        let result = func(&field);
        Box::pin(future::ready(result))
    })
}

/// Lifts an async function into the validator contract.
pub fn async_validator<F, Fut>(func: F) -> ValidatorFn
where
    F: Fn(Field) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<String>> + Send + 'static,
{
    Arc::new(move |field: Field| Box::pin(func(field)))
}

#[derive(Clone)]
struct ValidationEntry {
    key: String,
    validator: ValidatorFn,
}

/// Ordered validator list. Keys let callers override an entry (including the
/// built-ins) without duplicating it; an override keeps the original
/// position, so iteration order stays the insertion order.
#[derive(Clone, Default)]
pub struct Validations {
    entries: Vec<ValidationEntry>,
}

impl Validations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, validator: ValidatorFn) -> Self {
        self.insert(key, validator);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, validator: ValidatorFn) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == key) {
            entry.validator = validator;
        } else {
            self.entries.push(ValidationEntry { key, validator });
        }
    }

    pub(crate) fn merge(&mut self, other: Validations) {
        for entry in other.entries {
            self.insert(entry.key, entry.validator);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    fn validators(&self) -> Vec<ValidatorFn> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(&entry.validator))
            .collect()
    }
}

impl FormStore {
    /// Runs every validator attached to `name`, racing the run against its
    /// abort handle. Resolves once the run settles; callers inspect store
    /// state for the outcome. Validating an unregistered field is a caller
    /// bug and fails loudly.
    pub async fn validate_field(&self, name: &str) -> FormResult<()> {
        let (ticket, snapshot, abort) = self.begin_validation(name)?;

        let feedback = race_validators(snapshot, abort).await;
        if feedback.as_ref().is_some_and(Feedback::is_aborted) {
            // A newer run owns this field now; its commit carries the state.
            return Ok(());
        }

        self.finish_validation(name, ticket, feedback)
    }

    /// Step 1-2 of a run: abort the previous run, install a fresh handle,
    /// and flag the field as validating.
    fn begin_validation(
        &self,
        name: &str,
    ) -> FormResult<(ValidationTicket, Field, oneshot::Receiver<()>)> {
        let (ticket, snapshot, receiver, state_snapshot) = {
            let mut state = write_lock(&self.state, "starting field validation")?;
            let field = state
                .fields
                .get_mut(name)
                .ok_or_else(|| FormError::UnknownField(name.to_owned()))?;

            let mut runs = write_lock(&self.runs, "issuing validation ticket")?;
            let ticket = ValidationTicket::next();
            let (sender, receiver) = oneshot::channel();
            if let Some(previous) = runs.insert(
                name.to_owned(),
                RunHandle {
                    ticket,
                    abort: sender,
                },
            ) {
                // Supersede before the new run observes any state.
                let _ = previous.abort.send(());
            }
            drop(runs);

            field.is_validating = true;
            field.is_valid = false;
            field.feedback = None;
            let snapshot = field.clone();
            state.is_valid = false;
            (ticket, snapshot, receiver, state.clone())
        };
        self.notify(&state_snapshot)?;
        Ok((ticket, snapshot, receiver))
    }

    /// Step 6: commit the settled outcome, unless a newer ticket was issued
    /// or the field was removed while the run was in flight.
    fn finish_validation(
        &self,
        name: &str,
        ticket: ValidationTicket,
        feedback: Option<Feedback>,
    ) -> FormResult<()> {
        let state_snapshot = {
            let mut state = write_lock(&self.state, "finishing field validation")?;
            let mut runs = write_lock(&self.runs, "clearing validation ticket")?;
            if runs.get(name).map(|run| run.ticket) != Some(ticket) {
                return Ok(());
            }
            let Some(field) = state.fields.get_mut(name) else {
                // Field removed mid-flight; nothing to commit into.
                return Ok(());
            };
            runs.remove(name);
            drop(runs);

            field.is_validating = false;
            field.is_valid = feedback.is_none();
            field.feedback = feedback;
            state.is_valid = state.fields.values().all(|field| field.is_valid);
            state.clone()
        };
        self.notify(&state_snapshot)?;
        Ok(())
    }
}

/// Runs the field's validators in insertion order, short-circuiting on the
/// first failure, racing the whole pass against the abort signal. A dropped
/// sender counts as an abort, which is how field removal cancels a run.
async fn race_validators(field: Field, abort: oneshot::Receiver<()>) -> Option<Feedback> {
    let validators = field.validations.validators();
    let settle = Box::pin(async move {
        for validate in validators {
            if let Some(message) = validate(field.clone()).await {
                return Some(Feedback::error(message));
            }
        }
        None
    });

    match future::select(abort, settle).await {
        Either::Left(_) => Some(Feedback::Aborted),
        Either::Right((feedback, _)) => feedback,
    }
}
