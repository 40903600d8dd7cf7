use std::sync::{Arc, LazyLock};
use std::time::Duration;

use futures_timer::Delay;
use regex::Regex;

use crate::debounce::Debounced;
use crate::store::Field;
use crate::validation::{ValidatorFn, validator};
use crate::value::Value;

/// Key the built-in required validator registers under. Caller validators
/// using the same key override it.
pub const REQUIRED_KEY: &str = "required";

/// Key the built-in min-length validator registers under.
pub const MIN_LENGTH_KEY: &str = "min_length";

/// Collapse window of the stand-in account existence check.
pub const ACCOUNT_CHECK_DEBOUNCE: Duration = Duration::from_millis(500);

/// Settle delay of the stand-in account existence check.
pub const ACCOUNT_CHECK_SETTLE: Duration = Duration::from_secs(2);

/// Fails blank values (`Missing`, `Null`, `false`, empty text) on fields
/// flagged `required`. Zero passes.
pub fn required_validation() -> ValidatorFn {
    validator(|field| {
        let valid = !field.required || !field.value.is_blank();
        (!valid).then(|| format!("{} is required", field.display_label()))
    })
}

/// Fails text values shorter than the field's `min_length`. Non-text values
/// and fields without a threshold always pass.
pub fn min_length_validation() -> ValidatorFn {
    validator(|field| {
        let min_length = field.min_length?;
        match &field.value {
            Value::Text(text) if text.chars().count() < min_length => Some(format!(
                "{} must be at least {} characters",
                field.display_label(),
                min_length
            )),
            _ => None,
        }
    })
}

static EMAIL_TEST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@ ]*[^@., ]@[^@., ][^@ ]*\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Conservative email shape check: non-empty local part, one `@`, dotted
/// domain, alphabetic TLD of two or more characters.
pub fn is_email_format() -> ValidatorFn {
    validator(|field| {
        let valid = field
            .value
            .as_text()
            .is_some_and(|text| EMAIL_TEST_REGEX.is_match(text));
        (!valid).then(|| "Doesn't look like an email".to_owned())
    })
}

/// Debounced stand-in for a server-side uniqueness probe: after the settle
/// delay, text containing `"exists"` is reported as taken. Hosts supply a
/// real check through the same [`ValidatorFn`] contract.
pub fn email_account_check() -> ValidatorFn {
    email_account_check_with(ACCOUNT_CHECK_DEBOUNCE, ACCOUNT_CHECK_SETTLE)
}

pub fn email_account_check_with(wait: Duration, settle: Duration) -> ValidatorFn {
    let debounced = Debounced::new(wait, move |field: Field| async move {
        Delay::new(settle).await;
        let taken = field
            .value
            .as_text()
            .is_some_and(|text| text.contains("exists"));
        taken.then(|| "Email exists".to_owned())
    });
    Arc::new(move |field| debounced.call(field))
}
