//! Ordered validation rules applied after conversion.

use crate::convert::{AnyValue, TargetType, downcast};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    GreaterThan,
    Allowing,
    Rejecting,
    Custom,
}

type CheckFn<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// One predicate over a converted value, with the message reported on rejection.
pub struct Rule<T> {
    kind: RuleKind,
    check: CheckFn<T>,
}

impl<T> Clone for Rule<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            check: Arc::clone(&self.check),
        }
    }
}

impl<T> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("kind", &self.kind).finish()
    }
}

fn join_values<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl<T: 'static> Rule<T> {
    /// Accepts values strictly greater than `bound`.
    pub fn greater_than(bound: T) -> Self
    where
        T: PartialOrd + fmt::Display + Send + Sync,
    {
        Self {
            kind: RuleKind::GreaterThan,
            check: Arc::new(move |value: &T| {
                if *value > bound {
                    Ok(())
                } else {
                    Err(format!("must be greater than {bound}"))
                }
            }),
        }
    }

    /// Accepts only members of `allowed`.
    pub fn allowing(allowed: impl IntoIterator<Item = T>) -> Self
    where
        T: PartialEq + fmt::Display + Send + Sync,
    {
        let allowed: Vec<T> = allowed.into_iter().collect();
        Self {
            kind: RuleKind::Allowing,
            check: Arc::new(move |value: &T| {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(format!("must be one of: {}", join_values(&allowed)))
                }
            }),
        }
    }

    /// Rejects members of `rejected`.
    pub fn rejecting(rejected: impl IntoIterator<Item = T>) -> Self
    where
        T: PartialEq + fmt::Display + Send + Sync,
    {
        let rejected: Vec<T> = rejected.into_iter().collect();
        Self {
            kind: RuleKind::Rejecting,
            check: Arc::new(move |value: &T| {
                if rejected.contains(value) {
                    Err(format!("must not be: {}", join_values(&rejected)))
                } else {
                    Ok(())
                }
            }),
        }
    }

    /// Accepts values for which `predicate` holds; otherwise reports `message`.
    pub fn custom(
        message: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        let message = message.into();
        Self {
            kind: RuleKind::Custom,
            check: Arc::new(move |value: &T| {
                if predicate(value) {
                    Ok(())
                } else {
                    Err(message.clone())
                }
            }),
        }
    }
}

impl<T> Rule<T> {
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn check(&self, value: &T) -> Result<(), String> {
        (self.check)(value)
    }
}

/// Apply `rules` in order; the first rejection's message is returned.
pub fn validate<T>(value: &T, rules: &[Rule<T>]) -> Result<(), String> {
    rules.iter().try_for_each(|rule| rule.check(value))
}

type ErasedCheck = Arc<dyn Fn(&dyn AnyValue) -> Result<(), String> + Send + Sync>;

/// Conversion target plus its type-erased rules, shared by options and params.
#[derive(Clone)]
pub(crate) struct ValueSpec {
    target: TargetType,
    rule_count: usize,
    check: ErasedCheck,
}

impl ValueSpec {
    pub(crate) fn new<T: AnyValue>(rules: Vec<Rule<T>>) -> Self {
        let rule_count = rules.len();
        let check: ErasedCheck = Arc::new(move |value: &dyn AnyValue| {
            // The converter is keyed by the same TypeId, so a mismatch means no value to check.
            match downcast::<T>(value) {
                Some(value) => validate(value, &rules),
                None => Ok(()),
            }
        });
        Self {
            target: TargetType::of::<T>(),
            rule_count,
            check,
        }
    }

    pub(crate) fn target(&self) -> &TargetType {
        &self.target
    }

    pub(crate) fn check(&self, value: &dyn AnyValue) -> Result<(), String> {
        (self.check)(value)
    }
}

impl fmt::Debug for ValueSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSpec")
            .field("target", &self.target.name())
            .field("rules", &self.rule_count)
            .finish()
    }
}
