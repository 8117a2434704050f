//! Application predicate run on every assertion before it is recorded.

use valchain_messages::AssertionValue;

/// Decides whether a key/value assertion may be recorded as validated.
///
/// A rejection carries a reason that is sent back to the peer that
/// gossiped the assertion.
pub trait AssertionValidator: Send + Sync {
    fn validate(&self, key: &str, value: &AssertionValue) -> Result<(), String>;
}

/// Accepts every assertion.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl AssertionValidator for AcceptAll {
    fn validate(&self, _key: &str, _value: &AssertionValue) -> Result<(), String> {
        Ok(())
    }
}

impl<F> AssertionValidator for F
where
    F: Fn(&str, &AssertionValue) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, key: &str, value: &AssertionValue) -> Result<(), String> {
        self(key, value)
    }
}
