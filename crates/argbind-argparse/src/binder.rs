//! Positional parameter slots and the binder that fills them.

use crate::convert::{AnyValue, TargetType};
use crate::error::{DefinitionError, ParseError, ParseResult};
use crate::option::next_descriptor_id;
use crate::validate::{Rule, ValueSpec};
use argbind_metadata::{Completion, ParamArityMeta, ParamMeta};
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Opaque identity of one declared positional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamArity {
    Required,
    Optional,
    /// Takes every remaining token; at least `min` of them.
    Collected { min: usize },
}

impl ParamArity {
    fn meta(&self) -> ParamArityMeta {
        match self {
            Self::Required => ParamArityMeta::Required,
            Self::Optional => ParamArityMeta::Optional,
            Self::Collected { min } => ParamArityMeta::Collected { min: *min },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamDef {
    id: ParamId,
    name: String,
    arity: ParamArity,
    completion: Completion,
    value: ValueSpec,
}

impl ParamDef {
    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> ParamArity {
        self.arity
    }

    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    pub fn value_type(&self) -> &TargetType {
        self.value.target()
    }

    pub(crate) fn value_spec(&self) -> &ValueSpec {
        &self.value
    }

    pub(crate) fn meta(&self, value_type: String) -> ParamMeta {
        ParamMeta {
            name: self.name.clone(),
            arity: self.arity.meta(),
            value_type: Some(value_type),
            completion: self.completion.clone(),
        }
    }
}

/// Builder for a positional parameter of type `T`.
///
/// The arity is chosen when the builder is added to a command.
#[derive(Debug, Clone)]
pub struct ParamBuilder<T> {
    name: String,
    completion: Completion,
    rules: Vec<Rule<T>>,
}

pub fn param<T: AnyValue>(name: impl Into<String>) -> ParamBuilder<T> {
    ParamBuilder {
        name: name.into(),
        completion: Completion::None,
        rules: Vec::new(),
    }
}

impl<T: AnyValue> ParamBuilder<T> {
    pub fn completion(mut self, completion: Completion) -> Self {
        self.completion = completion;
        self
    }

    pub fn rule(mut self, rule: Rule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    pub(crate) fn build(self, arity: ParamArity) -> ParamDef {
        ParamDef {
            id: ParamId(next_descriptor_id()),
            name: self.name,
            arity,
            completion: self.completion,
            value: ValueSpec::new(self.rules),
        }
    }
}

macro_rules! typed_param_ref {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<T> {
            pub(crate) id: ParamId,
            _marker: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            pub(crate) fn new(id: ParamId) -> Self {
                Self {
                    id,
                    _marker: PhantomData,
                }
            }

            pub fn param_id(&self) -> ParamId {
                self.id
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
    };
}

typed_param_ref!(
    /// Handle to a required parameter.
    ParamRef
);
typed_param_ref!(
    /// Handle to an optional parameter.
    OptionalParamRef
);
typed_param_ref!(
    /// Handle to the collected (trailing, variadic) parameter.
    CollectedParamRef
);

/// Tokens assigned to one parameter, still unconverted.
#[derive(Debug, Clone)]
pub struct BoundParam {
    pub param: Arc<ParamDef>,
    pub tokens: Vec<String>,
}

/// Assigns positional tokens to declared slots.
#[derive(Debug, Clone, Default)]
pub struct ParameterBinder {
    params: Vec<Arc<ParamDef>>,
}

impl ParameterBinder {
    /// Check the declaration order: required, then optional, then at most one
    /// collected slot, which must be last.
    pub fn new(params: Vec<Arc<ParamDef>>) -> Result<Self, DefinitionError> {
        let mut seen_optional = false;
        let mut seen_collected = false;
        for p in &params {
            let name = p.name().to_string();
            match p.arity() {
                ParamArity::Collected { .. } if seen_collected => {
                    return Err(DefinitionError::MultipleCollected { name });
                }
                _ if seen_collected => return Err(DefinitionError::CollectedNotLast { name }),
                ParamArity::Required if seen_optional => {
                    return Err(DefinitionError::ParamOrder { name });
                }
                ParamArity::Required => {}
                ParamArity::Optional => seen_optional = true,
                ParamArity::Collected { .. } => seen_collected = true,
            }
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &[Arc<ParamDef>] {
        &self.params
    }

    /// Bind `tokens` in declaration order.
    ///
    /// Optional slots left without a token are omitted from the result; a
    /// collected slot is always present, possibly empty.
    pub fn bind(&self, tokens: Vec<String>) -> ParseResult<Vec<BoundParam>> {
        let mut remaining: VecDeque<String> = tokens.into();
        let mut bound = Vec::with_capacity(self.params.len());

        for p in &self.params {
            match p.arity() {
                ParamArity::Required => {
                    let Some(token) = remaining.pop_front() else {
                        return Err(ParseError::MissingRequiredParam {
                            name: p.name().to_string(),
                        });
                    };
                    bound.push(BoundParam {
                        param: Arc::clone(p),
                        tokens: vec![token],
                    });
                }
                ParamArity::Optional => {
                    if let Some(token) = remaining.pop_front() {
                        bound.push(BoundParam {
                            param: Arc::clone(p),
                            tokens: vec![token],
                        });
                    }
                }
                ParamArity::Collected { min } => {
                    let rest: Vec<String> = remaining.drain(..).collect();
                    if rest.len() < min {
                        return Err(ParseError::CollectedArity {
                            name: p.name().to_string(),
                            minimum: min,
                            received: rest.len(),
                        });
                    }
                    bound.push(BoundParam {
                        param: Arc::clone(p),
                        tokens: rest,
                    });
                }
            }
        }

        if !remaining.is_empty() {
            return Err(ParseError::ExtraArguments {
                tokens: remaining.into(),
            });
        }
        Ok(bound)
    }
}
