use argbind_argparse::{AnyValue, CommandInvocation, OptionKind, ParamArity, ParseError, downcast};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::PathBuf;

/// JSON form of a converted value; types a definition can declare map to
/// their natural JSON shape.
fn json_value(value: &dyn AnyValue) -> Value {
    if let Some(v) = downcast::<String>(value) {
        return Value::from(v.as_str());
    }
    if let Some(v) = downcast::<i64>(value) {
        return Value::from(*v);
    }
    if let Some(v) = downcast::<f64>(value) {
        return Value::from(*v);
    }
    if let Some(v) = downcast::<bool>(value) {
        return Value::from(*v);
    }
    if let Some(v) = downcast::<PathBuf>(value) {
        return Value::from(v.to_string_lossy().into_owned());
    }
    Value::String(format!("{value:?}"))
}

fn json_list(values: &[Box<dyn AnyValue>]) -> Value {
    Value::Array(values.iter().map(|v| json_value(&**v)).collect())
}

/// Bound values of one successful parse, keyed by option display name and
/// param name.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationReport {
    pub command: String,
    pub options: IndexMap<String, Value>,
    pub params: IndexMap<String, Value>,
}

impl InvocationReport {
    pub fn new(invocation: &CommandInvocation) -> Self {
        let options = invocation
            .options()
            .map(|opt| {
                let value = match opt.kind() {
                    OptionKind::Flag => Value::Bool(true),
                    OptionKind::Counter => Value::from(opt.occurrences()),
                    OptionKind::Key => opt
                        .values()
                        .last()
                        .map(|v| json_value(&**v))
                        .unwrap_or(Value::Null),
                    OptionKind::VariadicKey => json_list(opt.values()),
                };
                (opt.name().to_string(), value)
            })
            .collect();

        let params = invocation
            .params()
            .map(|p| {
                let value = match p.arity() {
                    ParamArity::Collected { .. } => json_list(p.values()),
                    ParamArity::Required | ParamArity::Optional => p
                        .values()
                        .first()
                        .map(|v| json_value(&**v))
                        .unwrap_or(Value::Null),
                };
                (p.name().to_string(), value)
            })
            .collect();

        Self {
            command: invocation.command().to_string(),
            options,
            params,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("command: {}\n", self.command);
        for (name, value) in &self.options {
            let _ = writeln!(out, "  {name} = {value}");
        }
        for (name, value) in &self.params {
            let _ = writeln!(out, "  <{name}> = {value}");
        }
        out
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

impl ErrorReport {
    pub fn new(err: &ParseError) -> Self {
        Self {
            kind: err.kind().as_str(),
            message: err.to_string(),
        }
    }
}
