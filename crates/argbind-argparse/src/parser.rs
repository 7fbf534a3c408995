//! Single left-to-right scan of argv for one command.

use crate::command::Command;
use crate::convert::{AnyValue, ValueConverter};
use crate::error::{ParseError, ParseResult};
use crate::invocation::CommandInvocation;
use crate::registry::OptionRegistry;
use crate::validate::ValueSpec;

/// How one argv token is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// `--`: every later token is positional.
    Separator,
    /// `-x`, `--name`, optionally with an inline `=value`.
    Option {
        name: &'a str,
        inline: Option<&'a str>,
    },
    /// `-abc` or `-abc=value`: several short options in one token (letters
    /// without the dash); an inline value belongs to the last letter.
    Cluster {
        letters: &'a str,
        inline: Option<&'a str>,
    },
    Positional(&'a str),
}

fn is_negative_number(arg: &str) -> bool {
    arg.strip_prefix('-')
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit() || c == '.'))
        .is_some_and(|rest| rest.parse::<f64>().is_ok())
}

fn classify<'a>(arg: &'a str, registry: &OptionRegistry) -> Token<'a> {
    if arg == "--" {
        return Token::Separator;
    }
    if arg == "-" || !arg.starts_with('-') {
        return Token::Positional(arg);
    }

    let (name, inline) = match arg.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (arg, None),
    };
    if registry.recognizes_option(name) {
        return Token::Option { name, inline };
    }
    if is_negative_number(arg) {
        return Token::Positional(arg);
    }
    if name.starts_with("--") || name.chars().count() <= 2 {
        return Token::Option { name, inline };
    }
    Token::Cluster {
        letters: &name[1..],
        inline,
    }
}

/// Whether `next` can serve as the value of a key given as the previous token.
fn usable_as_value(next: &str, registry: &OptionRegistry) -> bool {
    matches!(classify(next, registry), Token::Positional(_))
}

/// Orchestrates option resolution, binding, conversion and group checks.
///
/// ```
/// use argbind_argparse::{ArgumentParser, CommandBuilder, ParseError, param};
///
/// let mut builder = CommandBuilder::new("test");
/// builder.add_param(param::<String>("testName"));
/// builder.add_optional_param(param::<String>("testerName"));
/// let mut command = builder.build().unwrap();
///
/// let err = ArgumentParser::default()
///     .parse(&mut command, ["widget", "bob", "2"])
///     .unwrap_err();
/// assert_eq!(err, ParseError::ExtraArguments { tokens: vec!["2".to_string()] });
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArgumentParser {
    converter: ValueConverter,
}

impl ArgumentParser {
    pub fn new(converter: ValueConverter) -> Self {
        Self { converter }
    }

    pub fn converter(&self) -> &ValueConverter {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut ValueConverter {
        &mut self.converter
    }

    /// Parse `argv` (without the program name) for `command`.
    ///
    /// Usage counters are reset first, so a command can be parsed repeatedly.
    /// The first error ends the parse; nothing partial is returned.
    pub fn parse<I, S>(&self, command: &mut Command, argv: I) -> ParseResult<CommandInvocation>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = argv.into_iter().map(|s| s.as_ref().to_string()).collect();
        let mut invocation = CommandInvocation::new(command.name());
        let registry = command.registry_mut();
        registry.reset();

        let mut positionals: Vec<String> = Vec::new();
        let mut after_separator = false;
        let mut i = 0usize;
        while i < args.len() {
            let arg = args[i].as_str();
            if after_separator {
                positionals.push(arg.to_string());
                i += 1;
                continue;
            }

            let token = classify(arg, registry);
            tracing::trace!(?token, "classified argument");
            let next = args.get(i + 1).map(String::as_str);
            match token {
                Token::Separator => after_separator = true,
                Token::Positional(value) => positionals.push(value.to_string()),
                Token::Option { name, inline } => {
                    if self.apply_option(registry, &mut invocation, name, inline, next)? {
                        i += 1;
                    }
                }
                Token::Cluster { letters, inline } => {
                    let count = letters.chars().count();
                    for (k, c) in letters.chars().enumerate() {
                        let name = format!("-{c}");
                        // Only the last letter may take a value.
                        let (inline, next) = if k + 1 == count {
                            (inline, next)
                        } else {
                            (None, None)
                        };
                        if self.apply_option(registry, &mut invocation, &name, inline, next)? {
                            i += 1;
                        }
                    }
                }
            }
            i += 1;
        }

        let bound = command.binder().bind(positionals)?;
        for b in &bound {
            let values = b
                .tokens
                .iter()
                .map(|raw| {
                    let name = b.param.name();
                    self.convert_and_check(name, name, b.param.value_spec(), raw)
                })
                .collect::<ParseResult<Vec<_>>>()?;
            invocation.record_param(&b.param, b.tokens.clone(), values);
        }

        command.registry().validate_groups()?;

        tracing::debug!(
            command = %command.name(),
            options = invocation.options().count(),
            params = invocation.params().count(),
            "arguments bound"
        );
        Ok(invocation)
    }

    /// Resolve one option occurrence. Returns whether `next` was consumed.
    fn apply_option(
        &self,
        registry: &mut OptionRegistry,
        invocation: &mut CommandInvocation,
        name: &str,
        inline: Option<&str>,
        next: Option<&str>,
    ) -> ParseResult<bool> {
        if let Some(def) = registry.lookup_flag(name) {
            if let Some(value) = inline {
                return Err(ParseError::FlagTakesNoValue {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
            invocation.record_presence(&def);
            return Ok(false);
        }

        let Some(def) = registry.lookup_key(name) else {
            return Err(ParseError::UnrecognizedOption {
                token: name.to_string(),
            });
        };
        let registry: &OptionRegistry = registry;
        let (raw, consumed) = match inline {
            Some(value) => (value, false),
            None => match next.filter(|n| usable_as_value(n, registry)) {
                Some(value) => (value, true),
                None => {
                    return Err(ParseError::MissingValueForKey {
                        name: name.to_string(),
                    });
                }
            },
        };
        let Some(spec) = def.value_spec() else {
            return Err(ParseError::MissingValueForKey {
                name: name.to_string(),
            });
        };
        let value = self.convert_and_check(name, def.display_name(), spec, raw)?;
        invocation.record_value(&def, raw.to_string(), value);
        Ok(consumed)
    }

    /// `name` is the alias as typed (or the param name); rule failures report
    /// `target`, the display name.
    fn convert_and_check(
        &self,
        name: &str,
        target: &str,
        spec: &ValueSpec,
        raw: &str,
    ) -> ParseResult<Box<dyn AnyValue>> {
        let value = self
            .converter
            .convert(spec.target(), raw)
            .map_err(|rejection| ParseError::ConversionFailed {
                name: name.to_string(),
                target: rejection.target,
                raw: raw.to_string(),
                explanation: rejection.explanation,
            })?;
        spec.check(&*value)
            .map_err(|message| ParseError::ValidationFailed {
                target: target.to_string(),
                message,
            })?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{OptionalParamRef, ParamRef, param};
    use crate::command::CommandBuilder;
    use crate::convert::ValueEnum;
    use crate::option::{FlagRef, KeyRef, flag, key};
    use crate::registry::{OptionGroup, OptionSet, Restriction};
    use crate::validate::Rule;

    struct TestCommand {
        command: Command,
        silent: FlagRef,
        times: KeyRef<i64>,
        test_name: ParamRef<String>,
        tester_name: OptionalParamRef<String>,
    }

    fn test_command() -> TestCommand {
        let mut b = CommandBuilder::new("test").summary("A command to test stuff");
        let silent = b.add_flag(flag(["-s", "--silent"]).description("Silence all test output"));
        let times = b.add_key(
            key::<i64>(["-t", "--times"]).description("Number of times to run the test"),
        );
        let test_name = b.add_param(param::<String>("testName"));
        let tester_name = b.add_optional_param(param::<String>("testerName"));
        TestCommand {
            command: b.build().unwrap(),
            silent,
            times,
            test_name,
            tester_name,
        }
    }

    fn parse(command: &mut Command, argv: &[&str]) -> ParseResult<CommandInvocation> {
        ArgumentParser::default().parse(command, argv)
    }

    #[test]
    fn token_classification() {
        let mut set = OptionSet::new();
        set.add_flag(flag(["-1", "--one"]));
        let mut registry = OptionRegistry::new();
        registry.register(&set);

        assert_eq!(classify("--", &registry), Token::Separator);
        assert_eq!(classify("-", &registry), Token::Positional("-"));
        assert_eq!(classify("-1", &registry), Token::Option { name: "-1", inline: None });
        assert_eq!(classify("-2", &registry), Token::Positional("-2"));
        assert_eq!(classify("-.5", &registry), Token::Positional("-.5"));
        assert_eq!(
            classify("-inf", &registry),
            Token::Cluster { letters: "inf", inline: None }
        );
        assert_eq!(
            classify("--one=x", &registry),
            Token::Option { name: "--one", inline: Some("x") }
        );
        assert_eq!(
            classify("-ab=x=y", &registry),
            Token::Cluster { letters: "ab", inline: Some("x=y") }
        );
    }

    #[test]
    fn binds_flag_key_and_params() {
        let mut t = test_command();
        let inv = parse(&mut t.command, &["-s", "--times", "3", "widget"]).unwrap();
        assert_eq!(inv.command(), "test");
        assert!(inv.flag(t.silent));
        assert_eq!(inv.key(&t.times), Some(&3));
        assert_eq!(inv.param(&t.test_name).map(String::as_str), Some("widget"));
        assert_eq!(inv.optional_param(&t.tester_name), None);
    }

    #[test]
    fn options_may_interleave_with_params() {
        let mut t = test_command();
        let inv = parse(&mut t.command, &["widget", "-t=5", "bob", "--silent"]).unwrap();
        assert!(inv.flag(t.silent));
        assert_eq!(inv.key(&t.times), Some(&5));
        assert_eq!(inv.param(&t.test_name).map(String::as_str), Some("widget"));
        assert_eq!(inv.optional_param(&t.tester_name).map(String::as_str), Some("bob"));
    }

    #[test]
    fn extra_positional_is_rejected() {
        let mut t = test_command();
        match parse(&mut t.command, &["widget", "bob", "2"]).unwrap_err() {
            ParseError::ExtraArguments { tokens } => assert_eq!(tokens, ["2"]),
            other => panic!("expected ExtraArguments, got: {other:?}"),
        }
    }

    #[test]
    fn missing_required_param_is_reported() {
        let mut t = test_command();
        match parse(&mut t.command, &["-s"]).unwrap_err() {
            ParseError::MissingRequiredParam { name } => assert_eq!(name, "testName"),
            other => panic!("expected MissingRequiredParam, got: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_options_are_reported_as_typed() {
        let mut t = test_command();
        assert_eq!(
            parse(&mut t.command, &["widget", "--verbose"]).unwrap_err(),
            ParseError::UnrecognizedOption {
                token: "--verbose".to_string()
            }
        );
        assert_eq!(
            parse(&mut t.command, &["widget", "--times=2", "--bogus=1"]).unwrap_err(),
            ParseError::UnrecognizedOption {
                token: "--bogus".to_string()
            }
        );
        assert_eq!(
            parse(&mut t.command, &["-sx", "widget"]).unwrap_err(),
            ParseError::UnrecognizedOption {
                token: "-x".to_string()
            }
        );
    }

    #[test]
    fn key_without_value_is_reported() {
        let mut t = test_command();
        for argv in [&["widget", "-t"][..], &["-t", "--silent", "widget"], &["-t", "--", "3"]] {
            match parse(&mut t.command, argv).unwrap_err() {
                ParseError::MissingValueForKey { name } => assert_eq!(name, "-t"),
                other => panic!("expected MissingValueForKey for {argv:?}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn flag_rejects_inline_value() {
        let mut t = test_command();
        assert_eq!(
            parse(&mut t.command, &["--silent=yes", "widget"]).unwrap_err(),
            ParseError::FlagTakesNoValue {
                name: "--silent".to_string(),
                value: "yes".to_string()
            }
        );
    }

    #[test]
    fn key_conversion_failure_uses_generic_explanation() {
        let mut t = test_command();
        match parse(&mut t.command, &["-t", "many", "widget"]).unwrap_err() {
            ParseError::ConversionFailed {
                name,
                target,
                raw,
                explanation,
            } => {
                assert_eq!(name, "-t");
                assert_eq!(target, "integer");
                assert_eq!(raw, "many");
                assert_eq!(explanation, "expected an integer");
            }
            other => panic!("expected ConversionFailed, got: {other:?}"),
        }
    }

    #[test]
    fn negative_numbers_are_values_and_positionals() {
        let mut b = CommandBuilder::new("cmd");
        let offset = b.add_key(key::<i64>(["-o", "--offset"]));
        let first = b.add_param(param::<f64>("first"));
        let mut cmd = b.build().unwrap();

        let inv = parse(&mut cmd, &["--offset", "-3", "-0.5"]).unwrap();
        assert_eq!(inv.key(&offset), Some(&-3));
        assert_eq!(inv.param(&first), Some(&-0.5));
    }

    #[test]
    fn separator_ends_option_parsing() {
        let mut b = CommandBuilder::new("cmd");
        let all = b.add_flag(flag(["-a", "--all"]));
        let rest = b.add_collected_param(param::<String>("rest"), 0);
        let mut cmd = b.build().unwrap();

        let inv = parse(&mut cmd, &["-a", "--", "-a", "--all", "-"]).unwrap();
        assert!(inv.flag(all));
        let rest: Vec<&str> = inv.collected(&rest).into_iter().map(String::as_str).collect();
        assert_eq!(rest, ["-a", "--all", "-"]);
    }

    #[test]
    fn clustered_short_flags_expand() {
        let mut b = CommandBuilder::new("cmd");
        let alpha = b.add_flag(flag(["-a", "--alpha"]));
        let verbose = b.add_counter(flag(["-v", "--verbose"]));
        let beta = b.add_key(key::<String>(["-b", "--beta"]));
        let mut cmd = b.build().unwrap();

        let inv = parse(&mut cmd, &["-avvb", "value", "-v"]).unwrap();
        assert!(inv.flag(alpha));
        assert_eq!(inv.count(verbose), 3);
        assert_eq!(inv.key(&beta).map(String::as_str), Some("value"));

        let inv = parse(&mut cmd, &["-ab=inline"]).unwrap();
        assert!(inv.flag(alpha));
        assert_eq!(inv.key(&beta).map(String::as_str), Some("inline"));

        // A key inside a cluster cannot reach the next token.
        match parse(&mut cmd, &["-bv", "value"]).unwrap_err() {
            ParseError::MissingValueForKey { name } => assert_eq!(name, "-b"),
            other => panic!("expected MissingValueForKey, got: {other:?}"),
        }
    }

    #[test]
    fn variadic_keys_accumulate_and_keys_keep_the_last_value() {
        let mut b = CommandBuilder::new("cmd");
        let files = b.add_variadic_key(key::<String>(["-f", "--file"]).description("a file"));
        let name = b.add_key(key::<String>(["-n", "--name"]));
        let mut cmd = b.build().unwrap();

        let inv = parse(
            &mut cmd,
            &["-f", "firstFile", "--file", "secondFile", "-n", "a", "--name=b"],
        )
        .unwrap();
        let names: Vec<&str> = inv.values(&files).into_iter().map(String::as_str).collect();
        assert_eq!(names, ["firstFile", "secondFile"]);
        assert_eq!(inv.key(&name).map(String::as_str), Some("b"));

        let inv = parse(&mut cmd, &[]).unwrap();
        assert!(inv.values(&files).is_empty());
        assert_eq!(inv.key(&name), None);
    }

    #[test]
    fn variadic_key_rules_check_every_occurrence() {
        let mut b = CommandBuilder::new("cmd");
        let sizes = b.add_variadic_key(key::<u32>(["-f", "--size"]).rule(Rule::greater_than(0)));
        let mut cmd = b.build().unwrap();

        let inv = parse(&mut cmd, &["-f", "3", "--size=7"]).unwrap();
        assert_eq!(inv.values(&sizes), [&3, &7]);

        assert_eq!(
            parse(&mut cmd, &["-f", "3", "-f", "0"]).unwrap_err(),
            ParseError::ValidationFailed {
                target: "--size".to_string(),
                message: "must be greater than 0".to_string()
            }
        );
    }

    #[test]
    fn counter_counts_every_alias() {
        let mut b = CommandBuilder::new("cmd");
        let verbosity = b.add_counter(flag(["-v", "--verbose"]).description("Increase the verbosity"));
        let mut cmd = b.build().unwrap();

        let inv = parse(&mut cmd, &["-v", "--verbose", "-v"]).unwrap();
        assert_eq!(inv.count(verbosity), 3);
        let inv = parse(&mut cmd, &[]).unwrap();
        assert_eq!(inv.count(verbosity), 0);
    }

    struct Validated {
        command: Command,
        first_name: KeyRef<String>,
        age: KeyRef<i64>,
    }

    fn validated_command() -> Validated {
        let mut b = CommandBuilder::new("cmd");
        let capitalized = Rule::custom("Must be a capitalized first name", |s: &String| {
            let mut chars = s.chars();
            chars.next().is_some_and(char::is_uppercase) && chars.all(char::is_lowercase)
        });
        let first_name = b.add_key(key::<String>(["-n", "--name"]).rule(capitalized));
        let age = b.add_key(key::<i64>(["-a", "--age"]).rule(Rule::greater_than(18)));
        b.add_key(key::<String>(["-l", "--location"]).rule(Rule::rejecting([
            "Chicago".to_string(),
            "Boston".to_string(),
        ])));
        b.add_key(key::<String>("--holiday").rule(Rule::allowing([
            "Thanksgiving".to_string(),
            "Halloween".to_string(),
        ])));
        Validated {
            command: b.build().unwrap(),
            first_name,
            age,
        }
    }

    #[test]
    fn key_rules_run_after_conversion() {
        let mut v = validated_command();

        let inv = parse(&mut v.command, &["-n", "Jack", "-a", "19"]).unwrap();
        assert_eq!(inv.key(&v.first_name).map(String::as_str), Some("Jack"));
        assert_eq!(inv.key(&v.age), Some(&19));

        assert_eq!(
            parse(&mut v.command, &["-a", "18"]).unwrap_err(),
            ParseError::ValidationFailed {
                target: "--age".to_string(),
                message: "must be greater than 18".to_string()
            }
        );
        assert_eq!(
            parse(&mut v.command, &["-n", "jack"]).unwrap_err(),
            ParseError::ValidationFailed {
                target: "--name".to_string(),
                message: "Must be a capitalized first name".to_string()
            }
        );
        assert!(matches!(
            parse(&mut v.command, &["-l", "Boston"]),
            Err(ParseError::ValidationFailed { .. })
        ));
        assert!(parse(&mut v.command, &["--holiday", "Halloween"]).is_ok());

        // Conversion fails before any rule runs.
        assert!(matches!(
            parse(&mut v.command, &["-a", "old"]),
            Err(ParseError::ConversionFailed { .. })
        ));
    }

    #[test]
    fn param_conversion_and_rules() {
        let mut b = CommandBuilder::new("cmd");
        let age = b.add_optional_param(param::<i64>("age").rule(Rule::greater_than(18)));
        let mut cmd = b.build().unwrap();

        let inv = parse(&mut cmd, &["20"]).unwrap();
        assert_eq!(inv.optional_param(&age), Some(&20));
        let inv = parse(&mut cmd, &[]).unwrap();
        assert_eq!(inv.optional_param(&age), None);
        assert_eq!(
            parse(&mut cmd, &["16"]).unwrap_err(),
            ParseError::ValidationFailed {
                target: "age".to_string(),
                message: "must be greater than 18".to_string()
            }
        );
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Speed {
        Slow,
        Fast,
    }

    impl ValueEnum for Speed {
        fn variants() -> &'static [Self] {
            &[Speed::Slow, Speed::Fast]
        }
        fn as_str(&self) -> &'static str {
            match self {
                Speed::Slow => "slow",
                Speed::Fast => "fast",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Single {
        Value,
    }

    impl ValueEnum for Single {
        fn variants() -> &'static [Self] {
            &[Single::Value]
        }
        fn as_str(&self) -> &'static str {
            "value"
        }
        fn conversion_failure() -> Option<&'static str> {
            Some("only can be 'value'")
        }
    }

    #[test]
    fn enum_params_convert_in_declaration_order() {
        let mut b = CommandBuilder::new("cmd").summary("Limits param values to enum");
        let speed = b.add_param(param::<Speed>("speed"));
        let single = b.add_optional_param(param::<Single>("single"));
        let int = b.add_optional_param(param::<i64>("int"));
        let mut cmd = b.build().unwrap();
        let parser = ArgumentParser::new(
            ValueConverter::default()
                .with_enum::<Speed>()
                .with_enum::<Single>(),
        );

        let inv = parser.parse(&mut cmd, ["fast", "value", "3"]).unwrap();
        assert_eq!(inv.param(&speed), Some(&Speed::Fast));
        assert_eq!(inv.optional_param(&single), Some(&Single::Value));
        assert_eq!(inv.optional_param(&int), Some(&3));

        match parser.parse(&mut cmd, ["medium"]).unwrap_err() {
            ParseError::ConversionFailed {
                name, explanation, ..
            } => {
                assert_eq!(name, "speed");
                assert_eq!(explanation, "expected one of: slow, fast");
            }
            other => panic!("expected ConversionFailed, got: {other:?}"),
        }

        // The first param in declaration order fails first.
        match parser.parse(&mut cmd, ["medium", "other"]).unwrap_err() {
            ParseError::ConversionFailed { name, .. } => assert_eq!(name, "speed"),
            other => panic!("expected ConversionFailed, got: {other:?}"),
        }
        match parser.parse(&mut cmd, ["slow", "other"]).unwrap_err() {
            ParseError::ConversionFailed { explanation, .. } => {
                assert_eq!(explanation, "only can be 'value'")
            }
            other => panic!("expected ConversionFailed, got: {other:?}"),
        }
    }

    #[test]
    fn collected_params_convert_each_element() {
        let mut b = CommandBuilder::new("cmd");
        let first = b.add_param(param::<String>("req1"));
        let rest = b.add_collected_param(param::<u32>("req2").rule(Rule::greater_than(0)), 1);
        let mut cmd = b.build().unwrap();

        let inv = parse(&mut cmd, &["library", "1", "2", "3"]).unwrap();
        assert_eq!(inv.param(&first).map(String::as_str), Some("library"));
        assert_eq!(inv.collected(&rest), [&1, &2, &3]);

        assert!(matches!(
            parse(&mut cmd, &["library"]),
            Err(ParseError::CollectedArity { minimum: 1, received: 0, .. })
        ));
        assert!(matches!(
            parse(&mut cmd, &["library", "1", "0"]),
            Err(ParseError::ValidationFailed { .. })
        ));
    }

    fn alpha_beta(restrictions: &[Restriction]) -> (Command, FlagRef, FlagRef) {
        let mut b = CommandBuilder::new("cmd");
        let alpha = b.add_flag(flag(["-a", "--alpha"]).description("the alpha flag"));
        let beta = b.add_flag(flag(["-b", "--beta"]).description("the beta flag"));
        for r in restrictions {
            b.add_group(OptionGroup::new(*r, &[&alpha, &beta]));
        }
        (b.build().unwrap(), alpha, beta)
    }

    #[test]
    fn exactly_one_group_passes_only_with_one_use() {
        let (mut cmd, alpha, beta) = alpha_beta(&[Restriction::ExactlyOne]);

        let inv = parse(&mut cmd, &["-a"]).unwrap();
        assert!(inv.flag(alpha));
        assert!(!inv.flag(beta));
        assert!(parse(&mut cmd, &["--beta"]).is_ok());

        for argv in [&[][..], &["-a", "-b"], &["-a", "--alpha"], &["-ab"]] {
            match parse(&mut cmd, argv).unwrap_err() {
                ParseError::GroupRestrictionViolated {
                    restriction,
                    options,
                    ..
                } => {
                    assert_eq!(restriction, Restriction::ExactlyOne);
                    assert_eq!(options, ["--alpha", "--beta"]);
                }
                other => panic!("expected GroupRestrictionViolated for {argv:?}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn repeated_groups_are_checked_in_declaration_order() {
        let (mut cmd, _, _) =
            alpha_beta(&[Restriction::AtLeastOne, Restriction::AtMostOne, Restriction::AtMostOne]);
        assert!(parse(&mut cmd, &["-a"]).is_ok());

        match parse(&mut cmd, &[]).unwrap_err() {
            ParseError::GroupRestrictionViolated { restriction, count, .. } => {
                assert_eq!(restriction, Restriction::AtLeastOne);
                assert_eq!(count, 0);
            }
            other => panic!("expected GroupRestrictionViolated, got: {other:?}"),
        }
        match parse(&mut cmd, &["-a", "-b"]).unwrap_err() {
            ParseError::GroupRestrictionViolated { restriction, count, .. } => {
                assert_eq!(restriction, Restriction::AtMostOne);
                assert_eq!(count, 2);
            }
            other => panic!("expected GroupRestrictionViolated, got: {other:?}"),
        }
    }

    #[test]
    fn option_errors_win_over_group_checks() {
        let (mut cmd, _, _) = alpha_beta(&[Restriction::ExactlyOne]);
        assert!(matches!(
            parse(&mut cmd, &["-a", "-b", "--gamma"]),
            Err(ParseError::UnrecognizedOption { .. })
        ));
        assert!(matches!(
            parse(&mut cmd, &["-a", "extra"]),
            Err(ParseError::ExtraArguments { .. })
        ));
    }

    #[test]
    fn counters_reset_between_parses() {
        let (mut cmd, _, _) = alpha_beta(&[Restriction::AtMostOne]);
        assert!(parse(&mut cmd, &["-a"]).is_ok());
        assert!(parse(&mut cmd, &["-b"]).is_ok());
        assert_eq!(cmd.registry().group_count(0), Some(1));
    }

    #[test]
    fn embedded_option_sets_compose() {
        let mut shared = OptionSet::new();
        let verbose = shared.add_flag(flag(["-v", "--verbose"]).description("Show more output information"));
        let quiet = shared.add_flag(flag(["-q", "--quiet"]));
        shared.add_group(OptionGroup::at_most_one(&[&verbose, &quiet]));

        let mut b = CommandBuilder::new("test");
        b.embed(&shared);
        let silent = b.add_flag(flag(["-s", "--silent"]));
        let mut cmd = b.build().unwrap();

        let inv = parse(&mut cmd, &["-v", "-s"]).unwrap();
        assert!(inv.flag(verbose));
        assert!(inv.flag(silent));
        assert!(matches!(
            parse(&mut cmd, &["-v", "--quiet"]),
            Err(ParseError::GroupRestrictionViolated { .. })
        ));
    }

    #[test]
    fn later_alias_registration_shadows_earlier() {
        let mut shared = OptionSet::new();
        let inherited = shared.add_flag(flag(["-s", "--silent"]));
        shared.add_group(OptionGroup::exactly_one(&[&inherited]));

        let mut b = CommandBuilder::new("cmd");
        b.embed(&shared);
        let own = b.add_key(key::<String>(["--silent"]));
        let mut cmd = b.build().unwrap();

        // `--silent` is now the command's own key.
        let inv = parse(&mut cmd, &["-s", "--silent", "loud"]).unwrap();
        assert_eq!(inv.key(&own).map(String::as_str), Some("loud"));
        assert!(inv.flag(inherited));

        // The shadowed flag still counts for its group through `-s` only.
        assert!(matches!(
            parse(&mut cmd, &["--silent", "loud"]),
            Err(ParseError::GroupRestrictionViolated { count: 0, .. })
        ));
    }
}
