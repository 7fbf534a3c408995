//! Alias resolution, option composition and group restrictions.

use crate::convert::AnyValue;
use crate::error::{DefinitionError, ParseError, ParseResult};
use crate::option::{
    CounterRef, FlagBuilder, FlagRef, KeyBuilder, KeyRef, OptionDef, OptionHandle, OptionId,
    OptionKind, VariadicKeyRef,
};
use argbind_metadata::{GroupMeta, RestrictionMeta};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Restriction {
    ExactlyOne,
    AtMostOne,
    AtLeastOne,
}

impl Restriction {
    pub fn admits(&self, count: usize) -> bool {
        match self {
            Self::ExactlyOne => count == 1,
            Self::AtMostOne => count <= 1,
            Self::AtLeastOne => count >= 1,
        }
    }

    fn meta(&self) -> RestrictionMeta {
        match self {
            Self::ExactlyOne => RestrictionMeta::ExactlyOne,
            Self::AtMostOne => RestrictionMeta::AtMostOne,
            Self::AtLeastOne => RestrictionMeta::AtLeastOne,
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExactlyOne => "exactly one",
            Self::AtMostOne => "at most one",
            Self::AtLeastOne => "at least one",
        })
    }
}

/// A restriction over a set of options, checked once after the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionGroup {
    restriction: Restriction,
    members: Vec<OptionId>,
}

impl OptionGroup {
    pub fn new(restriction: Restriction, members: &[&dyn OptionHandle]) -> Self {
        Self {
            restriction,
            members: members.iter().map(|m| m.option_id()).collect(),
        }
    }

    pub fn exactly_one(members: &[&dyn OptionHandle]) -> Self {
        Self::new(Restriction::ExactlyOne, members)
    }

    pub fn at_most_one(members: &[&dyn OptionHandle]) -> Self {
        Self::new(Restriction::AtMostOne, members)
    }

    pub fn at_least_one(members: &[&dyn OptionHandle]) -> Self {
        Self::new(Restriction::AtLeastOne, members)
    }

    pub fn restriction(&self) -> Restriction {
        self.restriction
    }

    pub fn members(&self) -> &[OptionId] {
        &self.members
    }

    pub fn contains(&self, id: OptionId) -> bool {
        self.members.contains(&id)
    }

    /// Check `count` (the group's usage for one parse) against the restriction.
    pub fn validate(&self, count: usize, option_names: &[String]) -> ParseResult<()> {
        if self.restriction.admits(count) {
            return Ok(());
        }
        Err(ParseError::GroupRestrictionViolated {
            restriction: self.restriction,
            options: option_names.to_vec(),
            count,
        })
    }
}

/// Something that contributes options and groups to a registry.
pub trait OptionSource {
    fn options(&self) -> &[Arc<OptionDef>];

    fn groups(&self) -> &[OptionGroup];

    /// Sources registered before this one's own options.
    fn embedded(&self) -> &[OptionSet] {
        &[]
    }
}

/// A reusable bundle of options and groups.
///
/// Commands (and other sets) embed it; handles returned while building the set
/// stay valid in every command that embeds it.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    options: Vec<Arc<OptionDef>>,
    groups: Vec<OptionGroup>,
    embedded: Vec<OptionSet>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, def: OptionDef) -> OptionId {
        let id = def.id();
        self.options.push(Arc::new(def));
        id
    }

    pub fn add_flag(&mut self, builder: FlagBuilder) -> FlagRef {
        FlagRef(self.push(builder.build(OptionKind::Flag)))
    }

    pub fn add_counter(&mut self, builder: FlagBuilder) -> CounterRef {
        CounterRef(self.push(builder.build(OptionKind::Counter)))
    }

    pub fn add_key<T: AnyValue>(&mut self, builder: KeyBuilder<T>) -> KeyRef<T> {
        KeyRef::new(self.push(builder.build(OptionKind::Key)))
    }

    pub fn add_variadic_key<T: AnyValue>(&mut self, builder: KeyBuilder<T>) -> VariadicKeyRef<T> {
        VariadicKeyRef::new(self.push(builder.build(OptionKind::VariadicKey)))
    }

    pub fn add_group(&mut self, group: OptionGroup) -> &mut Self {
        self.groups.push(group);
        self
    }

    pub fn embed(&mut self, other: &OptionSet) -> &mut Self {
        self.embedded.push(other.clone());
        self
    }
}

impl OptionSource for OptionSet {
    fn options(&self) -> &[Arc<OptionDef>] {
        &self.options
    }

    fn groups(&self) -> &[OptionGroup] {
        &self.groups
    }

    fn embedded(&self) -> &[OptionSet] {
        &self.embedded
    }
}

/// Alias table plus parse-scoped usage counters for one command.
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    options: IndexMap<OptionId, Arc<OptionDef>>,
    aliases: HashMap<String, OptionId>,
    groups: Vec<OptionGroup>,
    usage: HashMap<OptionId, usize>,
    group_counts: Vec<usize>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `source` (embedded sources first) into this registry.
    ///
    /// A duplicate alias re-points to the later option. The earlier option stays
    /// registered and reachable through any aliases it still owns. A set reached
    /// through several embedding paths contributes its groups once.
    pub fn register(&mut self, source: &dyn OptionSource) {
        for inner in source.embedded() {
            self.register(inner);
        }
        for def in source.options() {
            for name in def.names() {
                if let Some(prev) = self.aliases.insert(name.clone(), def.id()) {
                    if prev != def.id() {
                        tracing::debug!(alias = %name, "alias shadowed by a later registration");
                    }
                }
            }
            self.options.insert(def.id(), Arc::clone(def));
        }
        for group in source.groups() {
            if self.groups.contains(group) {
                continue;
            }
            self.groups.push(group.clone());
            self.group_counts.push(0);
        }
    }

    pub fn recognizes_option(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    /// Resolve a flag or counter alias, counting the use.
    pub fn lookup_flag(&mut self, alias: &str) -> Option<Arc<OptionDef>> {
        self.lookup(alias, |kind| !kind.takes_value())
    }

    /// Resolve a key or variadic key alias, counting the use.
    pub fn lookup_key(&mut self, alias: &str) -> Option<Arc<OptionDef>> {
        self.lookup(alias, |kind| kind.takes_value())
    }

    fn lookup(
        &mut self,
        alias: &str,
        accepts: impl Fn(OptionKind) -> bool,
    ) -> Option<Arc<OptionDef>> {
        let id = *self.aliases.get(alias)?;
        let def = Arc::clone(self.options.get(&id)?);
        if !accepts(def.kind()) {
            return None;
        }
        self.increment(id);
        Some(def)
    }

    fn increment(&mut self, id: OptionId) {
        *self.usage.entry(id).or_default() += 1;
        for (group, count) in self.groups.iter().zip(self.group_counts.iter_mut()) {
            if group.contains(id) {
                *count += 1;
            }
        }
    }

    /// Zero every usage counter. The parser calls this before each scan.
    pub fn reset(&mut self) {
        self.usage.clear();
        self.group_counts.iter_mut().for_each(|c| *c = 0);
    }

    pub fn usage(&self, id: OptionId) -> usize {
        self.usage.get(&id).copied().unwrap_or(0)
    }

    pub fn group_count(&self, index: usize) -> Option<usize> {
        self.group_counts.get(index).copied()
    }

    /// Registered options in registration order.
    pub fn options(&self) -> impl Iterator<Item = &Arc<OptionDef>> {
        self.options.values()
    }

    pub fn option(&self, id: OptionId) -> Option<&Arc<OptionDef>> {
        self.options.get(&id)
    }

    pub fn groups(&self) -> &[OptionGroup] {
        &self.groups
    }

    fn member_names(&self, group: &OptionGroup) -> Vec<String> {
        group
            .members()
            .iter()
            .filter_map(|id| self.options.get(id))
            .map(|def| def.display_name().to_string())
            .collect()
    }

    /// Check every group in declaration order; the first violation is returned.
    pub fn validate_groups(&self) -> ParseResult<()> {
        for (group, count) in self.groups.iter().zip(&self.group_counts) {
            group.validate(*count, &self.member_names(group))?;
        }
        Ok(())
    }

    pub(crate) fn check_definition(&self) -> Result<(), DefinitionError> {
        for def in self.options.values() {
            def.check_definition()?;
        }
        let unknown = self
            .groups
            .iter()
            .flat_map(|g| g.members())
            .any(|id| !self.options.contains_key(id));
        if unknown {
            return Err(DefinitionError::UnknownGroupMember);
        }
        Ok(())
    }

    pub(crate) fn group_meta(&self) -> Vec<GroupMeta> {
        self.groups
            .iter()
            .map(|g| GroupMeta {
                restriction: g.restriction().meta(),
                options: self.member_names(g),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{flag, key};

    fn double_flags() -> (OptionSet, FlagRef, FlagRef) {
        let mut set = OptionSet::new();
        let alpha = set.add_flag(flag(["-a", "--alpha"]).description("the alpha flag"));
        let beta = set.add_flag(flag(["-b", "--beta"]).description("the beta flag"));
        (set, alpha, beta)
    }

    #[test]
    fn recognizes_exactly_the_registered_aliases() {
        let (mut set, _, _) = double_flags();
        set.add_key(key::<String>(["-n", "--name"]));
        let mut registry = OptionRegistry::new();
        registry.register(&set);

        for alias in ["-a", "--alpha", "-b", "--beta", "-n", "--name"] {
            assert!(registry.recognizes_option(alias), "{alias} should be recognized");
        }
        for alias in ["-A", "--Alpha", "alpha", "--alp", "-c", ""] {
            assert!(!registry.recognizes_option(alias), "{alias} should not be recognized");
        }
    }

    #[test]
    fn lookups_are_kind_specific() {
        let mut set = OptionSet::new();
        set.add_flag(flag(["-a", "--alpha"]));
        set.add_key(key::<String>(["-b", "--beta"]));
        let mut registry = OptionRegistry::new();
        registry.register(&set);

        assert!(registry.lookup_flag("-a").is_some());
        assert!(registry.lookup_key("-a").is_none());
        assert!(registry.lookup_key("--beta").is_some());
        assert!(registry.lookup_flag("--beta").is_none());
        assert!(registry.lookup_flag("--gamma").is_none());
    }

    #[test]
    fn any_alias_increments_every_containing_group_once() {
        let (mut set, alpha, beta) = double_flags();
        set.add_group(OptionGroup::at_most_one(&[&alpha, &beta]));
        set.add_group(OptionGroup::at_least_one(&[&alpha]));
        let mut registry = OptionRegistry::new();
        registry.register(&set);

        registry.lookup_flag("-a").unwrap();
        assert_eq!(registry.group_count(0), Some(1));
        assert_eq!(registry.group_count(1), Some(1));

        registry.lookup_flag("--alpha").unwrap();
        assert_eq!(registry.group_count(0), Some(2));
        assert_eq!(registry.group_count(1), Some(2));
        assert_eq!(registry.usage(alpha.option_id()), 2);

        registry.lookup_flag("--beta").unwrap();
        assert_eq!(registry.group_count(0), Some(3));
        assert_eq!(registry.group_count(1), Some(2));

        registry.reset();
        assert_eq!(registry.group_count(0), Some(0));
        assert_eq!(registry.usage(alpha.option_id()), 0);
    }

    #[test]
    fn exactly_one_admits_only_one() {
        let (mut set, alpha, beta) = double_flags();
        set.add_group(OptionGroup::exactly_one(&[&alpha, &beta]));
        let mut registry = OptionRegistry::new();
        registry.register(&set);

        match registry.validate_groups().unwrap_err() {
            ParseError::GroupRestrictionViolated {
                restriction,
                options,
                count,
            } => {
                assert_eq!(restriction, Restriction::ExactlyOne);
                assert_eq!(options, ["--alpha", "--beta"]);
                assert_eq!(count, 0);
            }
            other => panic!("expected GroupRestrictionViolated, got: {other:?}"),
        }

        registry.lookup_flag("-b").unwrap();
        assert!(registry.validate_groups().is_ok());

        registry.lookup_flag("-a").unwrap();
        assert!(matches!(
            registry.validate_groups(),
            Err(ParseError::GroupRestrictionViolated { count: 2, .. })
        ));
    }

    #[test]
    fn embedded_sources_register_first_and_later_alias_wins() {
        let mut base = OptionSet::new();
        let base_verbose = base.add_flag(flag(["-v", "--verbose"]));
        base.add_group(OptionGroup::at_most_one(&[&base_verbose]));

        let mut derived = OptionSet::new();
        derived.embed(&base);
        let derived_verbose = derived.add_counter(flag(["--verbose"]));

        let mut registry = OptionRegistry::new();
        registry.register(&derived);

        // `--verbose` now resolves to the later registration.
        let def = registry.lookup_flag("--verbose").unwrap();
        assert_eq!(def.id(), derived_verbose.option_id());
        assert_eq!(registry.group_count(0), Some(0));

        // The shadowed option is still reachable through `-v` and still counts.
        let def = registry.lookup_flag("-v").unwrap();
        assert_eq!(def.id(), base_verbose.option_id());
        assert_eq!(registry.group_count(0), Some(1));
        assert_eq!(registry.options().count(), 2);
    }

    #[test]
    fn shared_set_reached_twice_registers_its_groups_once() {
        let (mut common, alpha, _) = double_flags();
        common.add_group(OptionGroup::exactly_one(&[&alpha]));

        let mut left = OptionSet::new();
        left.embed(&common);
        let mut right = OptionSet::new();
        right.embed(&common);
        let mut top = OptionSet::new();
        top.embed(&left).embed(&right).embed(&common);

        let mut registry = OptionRegistry::new();
        registry.register(&top);
        assert_eq!(registry.groups().len(), 1);
        assert_eq!(registry.group_count(1), None);
        assert_eq!(registry.options().count(), 2);

        registry.lookup_flag("-a").unwrap();
        assert_eq!(registry.group_count(0), Some(1));
        assert!(registry.validate_groups().is_ok());
    }

    #[test]
    fn groups_must_reference_registered_options() {
        let (_, alpha, _) = double_flags();
        let mut set = OptionSet::new();
        set.add_group(OptionGroup::exactly_one(&[&alpha]));
        let mut registry = OptionRegistry::new();
        registry.register(&set);
        assert_eq!(
            registry.check_definition(),
            Err(DefinitionError::UnknownGroupMember)
        );
    }
}
