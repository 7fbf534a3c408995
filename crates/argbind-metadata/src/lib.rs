//! Shared descriptor model for argbind commands.
//!
//! This crate does not depend on the parsing engine.
//! The data types here are what the engine hands to collaborators it does not
//! implement itself:
//! - shell-completion generators (via [`Completion`] hints)
//! - help renderers (via names, descriptions and arities)

use serde::{Deserialize, Serialize};

/// Version of the [`CommandMetadata`] JSON layout.
pub const METADATA_FORMAT_VERSION: u32 = 1;

/// Completion hint attached to an option or positional parameter.
///
/// The engine stores and forwards this value unchanged; only completion
/// generators interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Completion {
    #[default]
    None,
    Filename,
    Values { values: Vec<CompletionValue> },
    Function { name: String },
}

impl Completion {
    /// Enumerated completion from `(value, description)` pairs.
    pub fn values<I, V, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, D)>,
        V: Into<String>,
        D: Into<String>,
    {
        Self::Values {
            values: pairs
                .into_iter()
                .map(|(value, description)| CompletionValue {
                    value: value.into(),
                    description: description.into(),
                })
                .collect(),
        }
    }

    /// Completion delegated to a named shell function.
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function { name: name.into() }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompletionValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionKindMeta {
    Flag,
    Counter,
    Key,
    VariadicKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamArityMeta {
    Required,
    Optional,
    Collected { min: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestrictionMeta {
    ExactlyOne,
    AtMostOne,
    AtLeastOne,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptionMeta {
    pub names: Vec<String>,
    pub kind: OptionKindMeta,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Completion::is_none")]
    pub completion: Completion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParamMeta {
    pub name: String,
    pub arity: ParamArityMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Completion::is_none")]
    pub completion: Completion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GroupMeta {
    pub restriction: RestrictionMeta,
    /// Display names (long alias preferred) of the governed options.
    pub options: Vec<String>,
}

/// Snapshot of everything a command declares, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandMetadata {
    pub format_version: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionMeta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamMeta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupMeta>,
}

impl CommandMetadata {
    pub fn new(name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            format_version: METADATA_FORMAT_VERSION,
            name: name.into(),
            summary: summary.into(),
            options: Vec::new(),
            params: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Encode as JSON bytes.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Encode as indented JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
