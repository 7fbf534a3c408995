//! Named option descriptors and their typed handles.

use crate::convert::{AnyValue, TargetType};
use crate::error::DefinitionError;
use crate::validate::{Rule, ValueSpec};
use argbind_metadata::{Completion, OptionKindMeta, OptionMeta};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide identity for option and param descriptors.
pub(crate) fn next_descriptor_id() -> u64 {
    NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed)
}

/// Opaque identity of one declared option, stable across every registry it is
/// registered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(u64);

impl OptionId {
    pub(crate) fn next() -> Self {
        Self(next_descriptor_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Boolean presence.
    Flag,
    /// Number of occurrences.
    Counter,
    /// One value; a repeated occurrence replaces the earlier value.
    Key,
    /// Every occurrence appends a value.
    VariadicKey,
}

impl OptionKind {
    pub fn takes_value(&self) -> bool {
        matches!(self, Self::Key | Self::VariadicKey)
    }

    fn meta(&self) -> OptionKindMeta {
        match self {
            Self::Flag => OptionKindMeta::Flag,
            Self::Counter => OptionKindMeta::Counter,
            Self::Key => OptionKindMeta::Key,
            Self::VariadicKey => OptionKindMeta::VariadicKey,
        }
    }
}

/// Alias collection accepted by the option builders.
///
/// Accepts a single name or multiple names via array/slice/vec. Names without a
/// leading dash are normalized: one character becomes `-c`, longer names `--name`.
pub trait AliasNames {
    fn into_names(self) -> Vec<String>;
}

impl AliasNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![normalize_alias(self)]
    }
}

impl AliasNames for &[&str] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| normalize_alias(s)).collect()
    }
}

impl<const N: usize> AliasNames for [&str; N] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| normalize_alias(s)).collect()
    }
}

impl AliasNames for Vec<String> {
    fn into_names(self) -> Vec<String> {
        self.iter().map(|s| normalize_alias(s)).collect()
    }
}

fn normalize_alias(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('-') || trimmed.is_empty() {
        trimmed.to_string()
    } else if trimmed.chars().count() == 1 {
        format!("-{trimmed}")
    } else {
        format!("--{trimmed}")
    }
}

/// `-x` (one character) or `--word`; no whitespace, no `=`.
fn check_alias(alias: &str) -> Result<(), DefinitionError> {
    let malformed = || DefinitionError::MalformedAlias {
        alias: alias.to_string(),
    };
    if alias.contains('=') || alias.chars().any(char::is_whitespace) {
        return Err(malformed());
    }
    if let Some(word) = alias.strip_prefix("--") {
        if word.is_empty() || word.starts_with('-') {
            return Err(malformed());
        }
        return Ok(());
    }
    match alias.strip_prefix('-') {
        Some(c) if c.chars().count() == 1 && c != "-" => Ok(()),
        _ => Err(malformed()),
    }
}

/// A declared option. Immutable once declared; usage is counted by the registry.
#[derive(Debug, Clone)]
pub struct OptionDef {
    id: OptionId,
    kind: OptionKind,
    names: Vec<String>,
    description: String,
    completion: Completion,
    value: Option<ValueSpec>,
}

impl OptionDef {
    pub fn id(&self) -> OptionId {
        self.id
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    /// Long alias if there is one, otherwise the first alias.
    pub fn display_name(&self) -> &str {
        self.names
            .iter()
            .find(|n| n.starts_with("--"))
            .or_else(|| self.names.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Conversion target for keys; `None` for flags and counters.
    pub fn value_type(&self) -> Option<&TargetType> {
        self.value.as_ref().map(|v| v.target())
    }

    pub(crate) fn value_spec(&self) -> Option<&ValueSpec> {
        self.value.as_ref()
    }

    pub(crate) fn check_definition(&self) -> Result<(), DefinitionError> {
        if self.names.is_empty() {
            return Err(DefinitionError::EmptyAliasList);
        }
        self.names.iter().try_for_each(|n| check_alias(n))
    }

    pub(crate) fn meta(&self, value_type: Option<String>) -> OptionMeta {
        OptionMeta {
            names: self.names.clone(),
            kind: self.kind.meta(),
            description: self.description.clone(),
            value_type,
            completion: self.completion.clone(),
        }
    }
}

/// Builder for flag and counter options.
#[derive(Debug, Clone, Default)]
pub struct FlagBuilder {
    names: Vec<String>,
    description: String,
}

/// Start declaring a flag (or counter) with the given aliases.
pub fn flag(names: impl AliasNames) -> FlagBuilder {
    FlagBuilder {
        names: names.into_names(),
        description: String::new(),
    }
}

impl FlagBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn build(self, kind: OptionKind) -> OptionDef {
        OptionDef {
            id: OptionId::next(),
            kind,
            names: self.names,
            description: self.description,
            completion: Completion::None,
            value: None,
        }
    }
}

/// Builder for key and variadic-key options carrying values of type `T`.
#[derive(Debug, Clone)]
pub struct KeyBuilder<T> {
    names: Vec<String>,
    description: String,
    completion: Completion,
    rules: Vec<Rule<T>>,
}

/// Start declaring a key (or variadic key) with the given aliases.
pub fn key<T: AnyValue>(names: impl AliasNames) -> KeyBuilder<T> {
    KeyBuilder {
        names: names.into_names(),
        description: String::new(),
        completion: Completion::None,
        rules: Vec::new(),
    }
}

impl<T: AnyValue> KeyBuilder<T> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    /// Append a validation rule; rules run in the order they were added.
    pub fn rule(mut self, rule: Rule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    pub(crate) fn build(self, kind: OptionKind) -> OptionDef {
        OptionDef {
            id: OptionId::next(),
            kind,
            names: self.names,
            description: self.description,
            completion: self.completion,
            value: Some(ValueSpec::new(self.rules)),
        }
    }
}

/// Anything that identifies a declared option (used for group membership).
pub trait OptionHandle {
    fn option_id(&self) -> OptionId;
}

impl OptionHandle for OptionId {
    fn option_id(&self) -> OptionId {
        *self
    }
}

/// Handle to a declared flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagRef(pub(crate) OptionId);

/// Handle to a declared counter flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterRef(pub(crate) OptionId);

impl OptionHandle for FlagRef {
    fn option_id(&self) -> OptionId {
        self.0
    }
}

impl OptionHandle for CounterRef {
    fn option_id(&self) -> OptionId {
        self.0
    }
}

macro_rules! typed_option_ref {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<T> {
            pub(crate) id: OptionId,
            _marker: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            pub(crate) fn new(id: OptionId) -> Self {
                Self {
                    id,
                    _marker: PhantomData,
                }
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.id).finish()
            }
        }

        impl<T> OptionHandle for $name<T> {
            fn option_id(&self) -> OptionId {
                self.id
            }
        }
    };
}

typed_option_ref!(
    /// Handle to a declared key of type `T`.
    KeyRef
);
typed_option_ref!(
    /// Handle to a declared variadic key of type `T`.
    VariadicKeyRef
);
