pub mod debounce;
pub mod provider;
pub mod store;
pub mod validation;
pub mod validators;
pub mod value;
pub mod wizard;


pub use debounce::{BoxedDebounceFuture, DEFAULT_DEBOUNCE, Debounced};
pub use provider::{ContextScope, FORM_CONTEXT, WIZARD_CONTEXT};
pub use store::{
    Feedback, Field, FieldOptions, FormError, FormResult, FormState, FormStore, SubscriptionId,
    form_store,
};
pub use validation::{
    BoxedValidationFuture, Validations, ValidationTicket, ValidatorFn, async_validator, validator,
};
pub use validators::{
    ACCOUNT_CHECK_DEBOUNCE, ACCOUNT_CHECK_SETTLE, MIN_LENGTH_KEY, REQUIRED_KEY,
    email_account_check, email_account_check_with, is_email_format, min_length_validation,
    required_validation,
};
pub use value::Value;
pub use wizard::{WizardStore, wizard_store};
