//! Argument recognition, binding and validation.
//!
//! This crate turns a flat argv into typed, validated values for one command:
//! - options (flags, counters, keys, variadic keys) are resolved by alias through an
//!   [`OptionRegistry`] that also counts usage for [`OptionGroup`] restrictions
//! - leftover tokens are bound to positional slots by a [`ParameterBinder`]
//! - raw text is turned into values by a [`ValueConverter`] and checked against
//!   ordered [`Rule`]s
//!
//! It does not route subcommands, render help or print anything. Callers get a
//! [`CommandInvocation`] or the first [`ParseError`] and decide what to do with it.
//!
//! # Example
//!
//! ```
//! use argbind_argparse::{ArgumentParser, CommandBuilder, flag, key, param};
//!
//! let mut builder = CommandBuilder::new("test");
//! let silent = builder.add_flag(flag(["-s", "--silent"]).description("Silence all test output"));
//! let times = builder.add_key(key::<i64>(["-t", "--times"]));
//! let test_name = builder.add_param(param::<String>("testName"));
//! let tester = builder.add_optional_param(param::<String>("testerName"));
//! let mut command = builder.build().unwrap();
//!
//! let parser = ArgumentParser::default();
//! let inv = parser.parse(&mut command, ["-s", "--times", "3", "widget"]).unwrap();
//! assert!(inv.flag(silent));
//! assert_eq!(inv.key(&times), Some(&3));
//! assert_eq!(inv.param(&test_name).map(String::as_str), Some("widget"));
//! assert_eq!(inv.optional_param(&tester), None);
//! ```

pub mod binder;
pub mod command;
pub mod convert;
pub mod error;
pub mod invocation;
pub mod option;
pub mod parser;
pub mod registry;
pub mod validate;

pub use argbind_metadata::{Completion, CommandMetadata};
pub use binder::{
    BoundParam, CollectedParamRef, OptionalParamRef, ParamArity, ParamBuilder, ParamDef, ParamId,
    ParamRef, ParameterBinder, param,
};
pub use command::{Command, CommandBuilder};
pub use convert::{AnyValue, Explanation, TargetType, ValueConverter, ValueEnum, downcast};
pub use error::{DefinitionError, ErrorKind, ParseError};
pub use invocation::{CommandInvocation, OptionValue, ParamValue};
pub use option::{
    AliasNames, CounterRef, FlagBuilder, FlagRef, KeyBuilder, KeyRef, OptionDef, OptionHandle,
    OptionId, OptionKind, VariadicKeyRef, flag, key,
};
pub use parser::ArgumentParser;
pub use registry::{OptionGroup, OptionRegistry, OptionSet, OptionSource, Restriction};
pub use validate::{Rule, RuleKind, validate};
