//! Parse and definition errors.

use crate::registry::Restriction;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// The first contract violation found while parsing one argv.
///
/// Errors found while reading an option occurrence (including conversion) name
/// the alias exactly as it was typed. Rule failures and group errors name
/// options by their display name (long alias preferred).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized option: {token}")]
    UnrecognizedOption { token: String },

    #[error("expected a value to follow {name}")]
    MissingValueForKey { name: String },

    #[error("flag {name} does not take a value (got '{value}')")]
    FlagTakesNoValue { name: String, value: String },

    #[error("invalid value '{raw}' for {name}: {explanation}")]
    ConversionFailed {
        name: String,
        target: String,
        raw: String,
        explanation: String,
    },

    #[error("invalid value for {target}: {message}")]
    ValidationFailed { target: String, message: String },

    #[error("missing required argument: <{name}>")]
    MissingRequiredParam { name: String },

    #[error("expected at least {minimum} value(s) for <{name}>, got {received}")]
    CollectedArity {
        name: String,
        minimum: usize,
        received: usize,
    },

    #[error("unexpected arguments: {}", .tokens.join(" "))]
    ExtraArguments { tokens: Vec<String> },

    #[error("must pass {restriction} of the following: {} (got {count})", .options.join(" "))]
    GroupRestrictionViolated {
        restriction: Restriction,
        options: Vec<String>,
        count: usize,
    },
}

/// Coarse classification of a [`ParseError`], stable for callers that map
/// errors to exit codes or machine-readable reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnrecognizedOption,
    MissingValue,
    InvalidValue,
    MissingParam,
    ExtraArguments,
    GroupRestriction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnrecognizedOption => "unrecognized-option",
            Self::MissingValue => "missing-value",
            Self::InvalidValue => "invalid-value",
            Self::MissingParam => "missing-param",
            Self::ExtraArguments => "extra-arguments",
            Self::GroupRestriction => "group-restriction",
        }
    }
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnrecognizedOption { .. } => ErrorKind::UnrecognizedOption,
            Self::MissingValueForKey { .. } => ErrorKind::MissingValue,
            Self::FlagTakesNoValue { .. }
            | Self::ConversionFailed { .. }
            | Self::ValidationFailed { .. } => ErrorKind::InvalidValue,
            Self::MissingRequiredParam { .. } | Self::CollectedArity { .. } => {
                ErrorKind::MissingParam
            }
            Self::ExtraArguments { .. } => ErrorKind::ExtraArguments,
            Self::GroupRestrictionViolated { .. } => ErrorKind::GroupRestriction,
        }
    }
}

/// A command definition that can never parse correctly.
///
/// Reported once by [`CommandBuilder::build`](crate::CommandBuilder::build), never
/// during parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("option must declare at least one alias")]
    EmptyAliasList,

    #[error("malformed option alias '{alias}'")]
    MalformedAlias { alias: String },

    #[error("required parameter <{name}> cannot follow an optional parameter")]
    ParamOrder { name: String },

    #[error("parameter <{name}> is a second collected parameter; at most one is allowed")]
    MultipleCollected { name: String },

    #[error("parameter <{name}> cannot follow the collected parameter")]
    CollectedNotLast { name: String },

    #[error("option group references an option that is not registered on this command")]
    UnknownGroupMember,
}
