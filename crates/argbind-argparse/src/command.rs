//! Command declarations and the metadata snapshot handed to collaborators.

use crate::binder::{
    CollectedParamRef, OptionalParamRef, ParamArity, ParamBuilder, ParamDef, ParamRef,
    ParameterBinder,
};
use crate::convert::{AnyValue, ValueConverter};
use crate::error::DefinitionError;
use crate::option::{CounterRef, FlagBuilder, FlagRef, KeyBuilder, KeyRef, VariadicKeyRef};
use crate::registry::{OptionGroup, OptionRegistry, OptionSet};
use argbind_metadata::CommandMetadata;
use std::sync::Arc;

/// Builder for a [`Command`].
///
/// Every `add_*` call returns the handle used to read the value back from a
/// [`CommandInvocation`](crate::CommandInvocation).
#[derive(Debug, Default)]
pub struct CommandBuilder {
    name: String,
    summary: String,
    options: OptionSet,
    params: Vec<Arc<ParamDef>>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn add_flag(&mut self, builder: FlagBuilder) -> FlagRef {
        self.options.add_flag(builder)
    }

    pub fn add_counter(&mut self, builder: FlagBuilder) -> CounterRef {
        self.options.add_counter(builder)
    }

    pub fn add_key<T: AnyValue>(&mut self, builder: KeyBuilder<T>) -> KeyRef<T> {
        self.options.add_key(builder)
    }

    pub fn add_variadic_key<T: AnyValue>(&mut self, builder: KeyBuilder<T>) -> VariadicKeyRef<T> {
        self.options.add_variadic_key(builder)
    }

    pub fn add_group(&mut self, group: OptionGroup) -> &mut Self {
        self.options.add_group(group);
        self
    }

    /// Compose a shared option set; its options register before this command's own.
    pub fn embed(&mut self, set: &OptionSet) -> &mut Self {
        self.options.embed(set);
        self
    }

    fn push_param<T: AnyValue>(&mut self, builder: ParamBuilder<T>, arity: ParamArity) -> ParamDef {
        let def = builder.build(arity);
        self.params.push(Arc::new(def.clone()));
        def
    }

    pub fn add_param<T: AnyValue>(&mut self, builder: ParamBuilder<T>) -> ParamRef<T> {
        ParamRef::new(self.push_param(builder, ParamArity::Required).id())
    }

    pub fn add_optional_param<T: AnyValue>(
        &mut self,
        builder: ParamBuilder<T>,
    ) -> OptionalParamRef<T> {
        OptionalParamRef::new(self.push_param(builder, ParamArity::Optional).id())
    }

    pub fn add_collected_param<T: AnyValue>(
        &mut self,
        builder: ParamBuilder<T>,
        min: usize,
    ) -> CollectedParamRef<T> {
        CollectedParamRef::new(self.push_param(builder, ParamArity::Collected { min }).id())
    }

    /// Resolve composition into a registry and check the declaration.
    pub fn build(self) -> Result<Command, DefinitionError> {
        let mut registry = OptionRegistry::new();
        registry.register(&self.options);
        registry.check_definition()?;
        let binder = ParameterBinder::new(self.params)?;
        Ok(Command {
            name: self.name,
            summary: self.summary,
            registry,
            binder,
        })
    }
}

/// A fully declared command: its option registry and positional binder.
///
/// Parsing needs `&mut Command` because the registry's usage counters belong to
/// the parse in flight. Clone the command to parse on several threads.
#[derive(Debug, Clone)]
pub struct Command {
    name: String,
    summary: String,
    registry: OptionRegistry,
    binder: ParameterBinder,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut OptionRegistry {
        &mut self.registry
    }

    pub fn binder(&self) -> &ParameterBinder {
        &self.binder
    }

    /// Descriptor snapshot for completion generators and help renderers.
    ///
    /// Value types are named the way `converter` names them.
    pub fn metadata(&self, converter: &ValueConverter) -> CommandMetadata {
        let mut meta = CommandMetadata::new(&self.name, &self.summary);
        meta.options = self
            .registry
            .options()
            .map(|def| def.meta(def.value_type().map(|t| converter.type_name(t))))
            .collect();
        meta.params = self
            .binder
            .params()
            .iter()
            .map(|p| p.meta(converter.type_name(p.value_type())))
            .collect();
        meta.groups = self.registry.group_meta();
        meta
    }
}
