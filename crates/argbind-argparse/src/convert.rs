//! Text-to-value conversion keyed by target type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// A converted argument value.
///
/// Implemented for every `'static` type that is `Debug + Send + Sync`, so parsed
/// values can be stored type-erased and read back with [`downcast`].
pub trait AnyValue: Any + fmt::Debug + Send + Sync {}

impl<T: Any + fmt::Debug + Send + Sync> AnyValue for T {}

/// Read a type-erased value back as `T`.
pub fn downcast<T: Any>(value: &dyn AnyValue) -> Option<&T> {
    let any: &dyn Any = value;
    any.downcast_ref::<T>()
}

/// Identity and display name of a conversion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetType {
    id: TypeId,
    name: &'static str,
}

impl TargetType {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Rust type name without its module path.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    // Keep generic arguments intact: `alloc::vec::Vec<u8>` -> `Vec<u8>`.
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Failure text reported when a conversion rejects its input.
#[derive(Clone)]
pub enum Explanation {
    /// `expected <type name>`, derived from the registered type name.
    Generic,
    /// Used verbatim.
    Text(String),
    /// Computed from the rejected raw text.
    Dynamic(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl Explanation {
    pub fn dynamic(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }

    fn render(&self, type_name: &str, raw: &str) -> String {
        match self {
            Self::Generic => generic_explanation(type_name),
            Self::Text(text) => text.clone(),
            Self::Dynamic(f) => f(raw),
        }
    }
}

impl fmt::Debug for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => f.write_str("Generic"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Explanation {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Explanation {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

fn generic_explanation(type_name: &str) -> String {
    let article = match type_name.chars().next() {
        Some(c) if "aeiouAEIOU".contains(c) => "an",
        _ => "a",
    };
    format!("expected {article} {type_name}")
}

/// A finite set of named values convertible from their canonical text.
///
/// ```
/// use argbind_argparse::{ValueConverter, ValueEnum};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Speed { Slow, Fast }
///
/// impl ValueEnum for Speed {
///     fn variants() -> &'static [Self] { &[Speed::Slow, Speed::Fast] }
///     fn as_str(&self) -> &'static str {
///         match self { Speed::Slow => "slow", Speed::Fast => "fast" }
///     }
/// }
///
/// let converter = ValueConverter::default().with_enum::<Speed>();
/// assert!(converter.supports::<Speed>());
/// ```
pub trait ValueEnum: AnyValue + Clone + Sized {
    fn variants() -> &'static [Self];

    fn as_str(&self) -> &'static str;

    /// Replaces the generic "expected one of" explanation when present.
    fn conversion_failure() -> Option<&'static str> {
        None
    }
}

type ConvertFn = Arc<dyn Fn(&str) -> Option<Box<dyn AnyValue>> + Send + Sync>;

#[derive(Clone)]
struct Conversion {
    type_name: String,
    convert: ConvertFn,
    explanation: Explanation,
}

/// Why a raw token could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub target: String,
    pub explanation: String,
}

/// Registry of conversions keyed by target type.
///
/// `ValueConverter::default()` knows booleans, every integer width, floats,
/// `char`, `String` and `PathBuf`. Domain types add themselves with
/// [`register`](Self::register), [`register_from_str`](Self::register_from_str)
/// or [`with_enum`](Self::with_enum).
#[derive(Clone)]
pub struct ValueConverter {
    table: HashMap<TypeId, Conversion>,
}

impl fmt::Debug for ValueConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.table.values().map(|c| c.type_name.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("ValueConverter").field("types", &names).finish()
    }
}

macro_rules! register_parsed {
    ($conv:ident, $name:expr, $($ty:ty),+ $(,)?) => {
        $(
            $conv.register::<$ty>($name, |raw| raw.parse::<$ty>().ok(), Explanation::Generic);
        )+
    };
}

impl Default for ValueConverter {
    fn default() -> Self {
        let mut conv = Self::empty();
        conv.register::<bool>("boolean", parse_bool, Explanation::Generic);
        register_parsed!(
            conv, "integer", i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize
        );
        register_parsed!(conv, "number", f32, f64);
        conv.register::<char>("character", parse_char, Explanation::Generic);
        conv.register::<String>("text", |raw| Some(raw.to_string()), Explanation::Generic);
        conv.register::<PathBuf>("path", |raw| Some(PathBuf::from(raw)), Explanation::Generic);
        conv
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_char(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

impl ValueConverter {
    /// A converter with no registrations at all.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Register (or replace) the conversion for `T`.
    pub fn register<T: AnyValue>(
        &mut self,
        type_name: impl Into<String>,
        convert: impl Fn(&str) -> Option<T> + Send + Sync + 'static,
        explanation: impl Into<Explanation>,
    ) -> &mut Self {
        let convert: ConvertFn =
            Arc::new(move |raw| convert(raw).map(|v| Box::new(v) as Box<dyn AnyValue>));
        self.table.insert(
            TypeId::of::<T>(),
            Conversion {
                type_name: type_name.into(),
                convert,
                explanation: explanation.into(),
            },
        );
        self
    }

    /// Register `T` through its `FromStr` implementation with the generic explanation.
    pub fn register_from_str<T>(&mut self, type_name: impl Into<String>) -> &mut Self
    where
        T: AnyValue + FromStr,
    {
        self.register::<T>(type_name, |raw| raw.parse::<T>().ok(), Explanation::Generic)
    }

    /// Register a [`ValueEnum`]; matching is exact and case-sensitive.
    pub fn register_enum<E: ValueEnum>(&mut self) -> &mut Self {
        let explanation = match E::conversion_failure() {
            Some(text) => Explanation::Text(text.to_string()),
            None => {
                let names: Vec<&str> = E::variants().iter().map(|v| v.as_str()).collect();
                Explanation::Text(format!("expected one of: {}", names.join(", ")))
            }
        };
        self.register::<E>(
            TargetType::of::<E>().name(),
            |raw| E::variants().iter().find(|v| v.as_str() == raw).cloned(),
            explanation,
        )
    }

    pub fn with_enum<E: ValueEnum>(mut self) -> Self {
        self.register_enum::<E>();
        self
    }

    pub fn supports<T: Any>(&self) -> bool {
        self.table.contains_key(&TypeId::of::<T>())
    }

    /// Display name registered for `target`, falling back to its Rust type name.
    pub fn type_name(&self, target: &TargetType) -> String {
        self.table
            .get(&target.id())
            .map(|c| c.type_name.clone())
            .unwrap_or_else(|| target.name().to_string())
    }

    pub fn convert(
        &self,
        target: &TargetType,
        raw: &str,
    ) -> Result<Box<dyn AnyValue>, Rejection> {
        let Some(conversion) = self.table.get(&target.id()) else {
            return Err(Rejection {
                target: target.name().to_string(),
                explanation: format!("no conversion registered for type {}", target.name()),
            });
        };
        (conversion.convert)(raw).ok_or_else(|| Rejection {
            target: conversion.type_name.clone(),
            explanation: conversion.explanation.render(&conversion.type_name, raw),
        })
    }
}
