use anyhow::{Context, Result, bail};
use argbind_argparse::{
    AnyValue, Command, CommandBuilder, OptionGroup, OptionHandle, OptionId, OptionSet,
    Restriction, Rule, flag, key, param,
};
use argbind_metadata::Completion;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DEFINITION_NAME: &str = "argbind.json";

/// A command declared in JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,

    /// Named option bundles; only those listed in `embed` are used.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub option_sets: IndexMap<String, OptionSetEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embed: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSetEntry {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionKindEntry {
    Flag,
    Counter,
    Key,
    VariadicKey,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueTypeEntry {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Path,
}

/// `{"greaterThan": 18}`, `{"allowing": [...]}` or `{"rejecting": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleEntry {
    GreaterThan(Value),
    Allowing(Vec<Value>),
    Rejecting(Vec<Value>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionEntry {
    pub names: Vec<String>,

    pub kind: OptionKindEntry,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Value type for keys; `string` when omitted.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueTypeEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,

    #[serde(default, skip_serializing_if = "Completion::is_none")]
    pub completion: Completion,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamArityEntry {
    #[default]
    Required,
    Optional,
    Collected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamEntry {
    pub name: String,

    #[serde(default)]
    pub arity: ParamArityEntry,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueTypeEntry>,

    /// Minimum token count for a collected param.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_count: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,

    #[serde(default, skip_serializing_if = "Completion::is_none")]
    pub completion: Completion,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleEntry>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RestrictionEntry {
    ExactlyOne,
    AtMostOne,
    AtLeastOne,
}

impl From<RestrictionEntry> for Restriction {
    fn from(entry: RestrictionEntry) -> Self {
        match entry {
            RestrictionEntry::ExactlyOne => Restriction::ExactlyOne,
            RestrictionEntry::AtMostOne => Restriction::AtMostOne,
            RestrictionEntry::AtLeastOne => Restriction::AtLeastOne,
        }
    }
}

/// Members are named by any alias listed in `names` of an option in scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntry {
    pub restriction: RestrictionEntry,
    pub options: Vec<String>,
}

/// Value types a definition can declare, with the rules each one supports.
trait DefinedType: AnyValue + Sized {
    fn rules(choices: &[Value], rules: &[RuleEntry]) -> Result<Vec<Rule<Self>>>;
}

fn typed_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .with_context(|| format!("rule value {value} does not match the declared type"))
}

fn typed_values<T: DeserializeOwned>(values: &[Value]) -> Result<Vec<T>> {
    values.iter().map(typed_value::<T>).collect()
}

fn typed_rules<T>(choices: &[Value], rules: &[RuleEntry]) -> Result<Vec<Rule<T>>>
where
    T: AnyValue + DeserializeOwned + PartialOrd + fmt::Display,
{
    let mut out = Vec::with_capacity(rules.len() + 1);
    if !choices.is_empty() {
        out.push(Rule::allowing(typed_values::<T>(choices)?));
    }
    for rule in rules {
        out.push(match rule {
            RuleEntry::GreaterThan(bound) => Rule::greater_than(typed_value::<T>(bound)?),
            RuleEntry::Allowing(values) => Rule::allowing(typed_values::<T>(values)?),
            RuleEntry::Rejecting(values) => Rule::rejecting(typed_values::<T>(values)?),
        });
    }
    Ok(out)
}

macro_rules! defined_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl DefinedType for $ty {
                fn rules(choices: &[Value], rules: &[RuleEntry]) -> Result<Vec<Rule<Self>>> {
                    typed_rules::<$ty>(choices, rules)
                }
            }
        )+
    };
}

defined_type!(String, i64, f64, bool);

impl DefinedType for PathBuf {
    fn rules(choices: &[Value], rules: &[RuleEntry]) -> Result<Vec<Rule<Self>>> {
        if !choices.is_empty() || !rules.is_empty() {
            bail!("choices and rules are not supported for path values");
        }
        Ok(Vec::new())
    }
}

/// Explicit completion wins; otherwise choices complete as values.
fn completion_for(completion: &Completion, choices: &[Value]) -> Completion {
    if !completion.is_none() || choices.is_empty() {
        return completion.clone();
    }
    Completion::values(choices.iter().map(|c| {
        let text = match c {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (text, String::new())
    }))
}

fn add_key_as<T: DefinedType>(set: &mut OptionSet, entry: &OptionEntry) -> Result<OptionId> {
    let mut builder = key::<T>(entry.names.clone())
        .description(&entry.description)
        .completion(completion_for(&entry.completion, &entry.choices));
    for rule in T::rules(&entry.choices, &entry.rules)? {
        builder = builder.rule(rule);
    }
    Ok(match entry.kind {
        OptionKindEntry::VariadicKey => set.add_variadic_key(builder).option_id(),
        _ => set.add_key(builder).option_id(),
    })
}

fn add_option(set: &mut OptionSet, entry: &OptionEntry) -> Result<OptionId> {
    match entry.kind {
        OptionKindEntry::Flag | OptionKindEntry::Counter => {
            if entry.value_type.is_some() || !entry.choices.is_empty() || !entry.rules.is_empty() {
                bail!("flags and counters take no value type, choices or rules");
            }
            let builder = flag(entry.names.clone()).description(&entry.description);
            Ok(if entry.kind == OptionKindEntry::Flag {
                set.add_flag(builder).option_id()
            } else {
                set.add_counter(builder).option_id()
            })
        }
        OptionKindEntry::Key | OptionKindEntry::VariadicKey => {
            match entry.value_type.unwrap_or_default() {
                ValueTypeEntry::String => add_key_as::<String>(set, entry),
                ValueTypeEntry::Integer => add_key_as::<i64>(set, entry),
                ValueTypeEntry::Number => add_key_as::<f64>(set, entry),
                ValueTypeEntry::Boolean => add_key_as::<bool>(set, entry),
                ValueTypeEntry::Path => add_key_as::<PathBuf>(set, entry),
            }
        }
    }
}

fn add_param_as<T: DefinedType>(builder: &mut CommandBuilder, entry: &ParamEntry) -> Result<()> {
    let mut param = param::<T>(&entry.name).completion(completion_for(&entry.completion, &entry.choices));
    for rule in T::rules(&entry.choices, &entry.rules)? {
        param = param.rule(rule);
    }
    match entry.arity {
        ParamArityEntry::Required => {
            builder.add_param(param);
        }
        ParamArityEntry::Optional => {
            builder.add_optional_param(param);
        }
        ParamArityEntry::Collected => {
            builder.add_collected_param(param, entry.min_count);
        }
    }
    Ok(())
}

fn add_param(builder: &mut CommandBuilder, entry: &ParamEntry) -> Result<()> {
    if entry.min_count > 0 && entry.arity != ParamArityEntry::Collected {
        bail!("minCount only applies to collected params");
    }
    match entry.value_type.unwrap_or_default() {
        ValueTypeEntry::String => add_param_as::<String>(builder, entry),
        ValueTypeEntry::Integer => add_param_as::<i64>(builder, entry),
        ValueTypeEntry::Number => add_param_as::<f64>(builder, entry),
        ValueTypeEntry::Boolean => add_param_as::<bool>(builder, entry),
        ValueTypeEntry::Path => add_param_as::<PathBuf>(builder, entry),
    }
}

/// Alias to option lookup used to resolve group members by name.
#[derive(Debug, Default)]
struct AliasScope {
    ids: HashMap<String, OptionId>,
}

impl AliasScope {
    fn insert(&mut self, entry: &OptionEntry, id: OptionId) {
        for name in &entry.names {
            self.ids.insert(name.clone(), id);
        }
    }

    fn extend(&mut self, other: AliasScope) {
        self.ids.extend(other.ids);
    }

    fn group(&self, entry: &GroupEntry) -> Result<OptionGroup> {
        let members = entry
            .options
            .iter()
            .map(|name| {
                self.ids
                    .get(name)
                    .copied()
                    .with_context(|| format!("group references unknown option '{name}'"))
            })
            .collect::<Result<Vec<OptionId>>>()?;
        let handles: Vec<&dyn OptionHandle> = members.iter().map(|id| id as &dyn OptionHandle).collect();
        Ok(OptionGroup::new(entry.restriction.into(), &handles))
    }
}

impl OptionSetEntry {
    fn build(&self) -> Result<(OptionSet, AliasScope)> {
        let mut set = OptionSet::new();
        let mut scope = AliasScope::default();
        for entry in &self.options {
            let id = add_option(&mut set, entry)
                .with_context(|| format!("invalid option {}", entry.names.join("/")))?;
            scope.insert(entry, id);
        }
        for group in &self.groups {
            set.add_group(scope.group(group)?);
        }
        Ok((set, scope))
    }
}

impl Definition {
    /// Declare the command described by this definition.
    ///
    /// Embedded sets register in `embed` order, then the command's own options.
    pub fn build(&self) -> Result<Command> {
        let mut builder = CommandBuilder::new(&self.name).summary(&self.summary);
        let mut scope = AliasScope::default();

        for name in &self.embed {
            let Some(entry) = self.option_sets.get(name) else {
                bail!("unknown option set '{name}' in embed list");
            };
            let (set, set_scope) = entry
                .build()
                .with_context(|| format!("invalid option set '{name}'"))?;
            builder.embed(&set);
            scope.extend(set_scope);
        }

        let own = OptionSetEntry {
            options: self.options.clone(),
            groups: Vec::new(),
        };
        let (set, own_scope) = own.build()?;
        builder.embed(&set);
        scope.extend(own_scope);

        for group in &self.groups {
            builder.add_group(scope.group(group)?);
        }
        for entry in &self.params {
            add_param(&mut builder, entry)
                .with_context(|| format!("invalid param <{}>", entry.name))?;
        }

        builder.build().context("invalid command definition")
    }
}

pub fn load_definition(path: &Path) -> Result<Definition> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let path = resolve_against(&cwd, path);
    if !path.exists() {
        bail!("definition not found: {}", path.display());
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read definition: {}", path.display()))?;
    let definition: Definition = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse definition JSON: {}", path.display()))?;
    tracing::debug!(path = %path.display(), command = %definition.name, "loaded command definition");
    Ok(definition)
}

/// Sample definition written by `argbind init`.
pub fn sample_definition(name: &str) -> Definition {
    let common = OptionSetEntry {
        options: vec![OptionEntry {
            names: vec!["-v".to_string(), "--verbose".to_string()],
            kind: OptionKindEntry::Counter,
            description: "Increase the verbosity".to_string(),
            value_type: None,
            choices: Vec::new(),
            completion: Completion::None,
            rules: Vec::new(),
        }],
        groups: Vec::new(),
    };

    Definition {
        name: name.to_string(),
        summary: "A command to test stuff".to_string(),
        option_sets: IndexMap::from([("common".to_string(), common)]),
        embed: vec!["common".to_string()],
        options: vec![
            OptionEntry {
                names: vec!["-s".to_string(), "--silent".to_string()],
                kind: OptionKindEntry::Flag,
                description: "Silence all test output".to_string(),
                value_type: None,
                choices: Vec::new(),
                completion: Completion::None,
                rules: Vec::new(),
            },
            OptionEntry {
                names: vec!["-t".to_string(), "--times".to_string()],
                kind: OptionKindEntry::Key,
                description: "Number of times to run the test".to_string(),
                value_type: Some(ValueTypeEntry::Integer),
                choices: Vec::new(),
                completion: Completion::None,
                rules: vec![RuleEntry::GreaterThan(Value::from(0))],
            },
        ],
        params: vec![
            ParamEntry {
                name: "testName".to_string(),
                arity: ParamArityEntry::Required,
                value_type: None,
                min_count: 0,
                choices: Vec::new(),
                completion: Completion::None,
                rules: Vec::new(),
            },
            ParamEntry {
                name: "testerName".to_string(),
                arity: ParamArityEntry::Optional,
                value_type: None,
                min_count: 0,
                choices: Vec::new(),
                completion: Completion::None,
                rules: Vec::new(),
            },
        ],
        groups: Vec::new(),
    }
}

pub fn write_default_definition(project_dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_DEFINITION_NAME);
    if dest.exists() && !overwrite {
        return Ok(dest);
    }

    let name = guess_command_name(project_dir).unwrap_or_else(|| "test".to_string());
    let definition = sample_definition(&name);

    let bytes = serde_json::to_vec_pretty(&definition).context("failed to serialize definition")?;
    let mut out = String::from_utf8(bytes).context("definition is not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn guess_command_name(project_dir: &Path) -> Option<String> {
    let meaningful = |s: &&str| !s.is_empty() && *s != "." && *s != "..";
    if let Some(name) = project_dir
        .file_name()
        .and_then(|s| s.to_str())
        .filter(meaningful)
    {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(meaningful)
        .map(|s| s.to_string())
}
