//! The bound, validated result of one parse.

use crate::binder::{CollectedParamRef, OptionalParamRef, ParamArity, ParamDef, ParamId, ParamRef};
use crate::convert::{AnyValue, downcast};
use crate::option::{CounterRef, FlagRef, KeyRef, OptionDef, OptionId, OptionKind, VariadicKeyRef};
use indexmap::IndexMap;
use std::any::Any;

/// Everything recorded for one option during a parse.
#[derive(Debug)]
pub struct OptionValue {
    name: String,
    kind: OptionKind,
    occurrences: usize,
    raw: Vec<String>,
    values: Vec<Box<dyn AnyValue>>,
}

impl OptionValue {
    /// Display name of the option (long alias preferred).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    pub fn occurrences(&self) -> usize {
        self.occurrences
    }

    /// Raw text of the values in effect (the last one for a key).
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn values(&self) -> &[Box<dyn AnyValue>] {
        &self.values
    }
}

/// Converted values bound to one positional parameter.
#[derive(Debug)]
pub struct ParamValue {
    name: String,
    arity: ParamArity,
    raw: Vec<String>,
    values: Vec<Box<dyn AnyValue>>,
}

impl ParamValue {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> ParamArity {
        self.arity
    }

    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn values(&self) -> &[Box<dyn AnyValue>] {
        &self.values
    }
}

/// Side table of parsed values, read back through the handles returned when
/// the command was declared.
///
/// Options appear in first-occurrence order, params in declaration order.
/// Absent options and unfilled optional params have no entry.
#[derive(Debug)]
pub struct CommandInvocation {
    command: String,
    options: IndexMap<OptionId, OptionValue>,
    params: IndexMap<ParamId, ParamValue>,
}

fn typed<T: Any>(values: &[Box<dyn AnyValue>]) -> impl Iterator<Item = &T> {
    values.iter().filter_map(|v| downcast::<T>(&**v))
}

impl CommandInvocation {
    pub(crate) fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            options: IndexMap::new(),
            params: IndexMap::new(),
        }
    }

    fn entry(&mut self, def: &OptionDef) -> &mut OptionValue {
        self.options
            .entry(def.id())
            .or_insert_with(|| OptionValue {
                name: def.display_name().to_string(),
                kind: def.kind(),
                occurrences: 0,
                raw: Vec::new(),
                values: Vec::new(),
            })
    }

    pub(crate) fn record_presence(&mut self, def: &OptionDef) {
        self.entry(def).occurrences += 1;
    }

    pub(crate) fn record_value(&mut self, def: &OptionDef, raw: String, value: Box<dyn AnyValue>) {
        let entry = self.entry(def);
        entry.occurrences += 1;
        if entry.kind == OptionKind::Key {
            entry.raw.clear();
            entry.values.clear();
        }
        entry.raw.push(raw);
        entry.values.push(value);
    }

    pub(crate) fn record_param(
        &mut self,
        def: &ParamDef,
        raw: Vec<String>,
        values: Vec<Box<dyn AnyValue>>,
    ) {
        self.params.insert(
            def.id(),
            ParamValue {
                name: def.name().to_string(),
                arity: def.arity(),
                raw,
                values,
            },
        );
    }

    /// Name of the command this invocation was parsed for.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn flag(&self, flag: FlagRef) -> bool {
        self.options.contains_key(&flag.0)
    }

    pub fn count(&self, counter: CounterRef) -> usize {
        self.options
            .get(&counter.0)
            .map(|v| v.occurrences)
            .unwrap_or(0)
    }

    pub fn key<T: Any>(&self, key: &KeyRef<T>) -> Option<&T> {
        let entry = self.options.get(&key.id)?;
        typed::<T>(&entry.values).last()
    }

    pub fn values<T: Any>(&self, key: &VariadicKeyRef<T>) -> Vec<&T> {
        self.options
            .get(&key.id)
            .map(|entry| typed::<T>(&entry.values).collect())
            .unwrap_or_default()
    }

    /// `None` only when the handle belongs to a different command.
    pub fn param<T: Any>(&self, param: &ParamRef<T>) -> Option<&T> {
        let entry = self.params.get(&param.id)?;
        typed::<T>(&entry.values).next()
    }

    pub fn optional_param<T: Any>(&self, param: &OptionalParamRef<T>) -> Option<&T> {
        let entry = self.params.get(&param.id)?;
        typed::<T>(&entry.values).next()
    }

    pub fn collected<T: Any>(&self, param: &CollectedParamRef<T>) -> Vec<&T> {
        self.params
            .get(&param.id)
            .map(|entry| typed::<T>(&entry.values).collect())
            .unwrap_or_default()
    }

    pub fn options(&self) -> impl Iterator<Item = &OptionValue> {
        self.options.values()
    }

    pub fn params(&self) -> impl Iterator<Item = &ParamValue> {
        self.params.values()
    }
}
