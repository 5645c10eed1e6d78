//! Named destination options and the validation gate a destination passes
//! through before it is allowed to do any I/O.

use crate::error::{InvalidOption, InvalidOptionReason};
use crate::types::RawOptions;

/// A validation rule attached to a [`DestOption`].
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// The option must have a non-blank effective value.
    Required,
    /// The value must equal one of the choices, ignoring ASCII case.
    OneOf(Vec<String>),
    /// The value must parse as an integer within `min..=max`.
    Integer { min: i64, max: i64 },
}

/// A single named option: its raw configured value, an optional default and
/// the rules the effective value has to satisfy.
#[derive(Debug, Clone)]
pub struct DestOption {
    name: String,
    raw_value: Option<String>,
    default: Option<String>,
    rules: Vec<Rule>,
}

impl DestOption {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            raw_value: None,
            default: None,
            rules: Vec::new(),
        }
    }

    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    pub fn one_of(self, choices: &[&str]) -> Self {
        self.rule(Rule::OneOf(choices.iter().map(|c| c.to_string()).collect()))
    }

    pub fn integer(self, min: i64, max: i64) -> Self {
        self.rule(Rule::Integer { min, max })
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn default_value(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    pub fn with_raw_value(mut self, value: impl Into<String>) -> Self {
        self.raw_value = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_value(&self) -> Option<&str> {
        self.raw_value.as_deref()
    }

    /// The configured value, falling back to the default.
    pub fn value(&self) -> Option<&str> {
        self.raw_value.as_deref().or(self.default.as_deref())
    }

    /// Checks every rule in declaration order and reports the first violation.
    pub fn validate(&self) -> Result<(), InvalidOption> {
        for rule in &self.rules {
            self.check(rule)?;
        }
        Ok(())
    }

    fn check(&self, rule: &Rule) -> Result<(), InvalidOption> {
        let value = match (rule, self.value()) {
            (Rule::Required, value) => {
                return match value {
                    Some(v) if !v.trim().is_empty() => Ok(()),
                    _ => Err(self.invalid(
                        InvalidOptionReason::Missing,
                        "is a required option".to_string(),
                    )),
                };
            }
            // Only `Required` cares about absent values.
            (_, None) => return Ok(()),
            (_, Some(value)) => value,
        };

        match rule {
            Rule::Required => Ok(()),
            Rule::OneOf(choices) => {
                if choices.iter().any(|c| c.eq_ignore_ascii_case(value)) {
                    Ok(())
                } else {
                    Err(self.invalid(
                        InvalidOptionReason::NotInChoices,
                        format!(
                            "must be one of the following values: {}",
                            choices.join(", ")
                        ),
                    ))
                }
            }
            Rule::Integer { min, max } => {
                let parsed: i64 = value.trim().parse().map_err(|_| {
                    self.invalid(
                        InvalidOptionReason::NotANumber,
                        "must be a numerical value".to_string(),
                    )
                })?;
                if parsed < *min || parsed > *max {
                    return Err(self.invalid(
                        InvalidOptionReason::OutOfRange,
                        format!("must be between {min} and {max}"),
                    ));
                }
                Ok(())
            }
        }
    }

    fn invalid(&self, reason: InvalidOptionReason, what: String) -> InvalidOption {
        InvalidOption::new(&self.name, reason, format!("option {} {what}", self.name))
    }
}

/// The declared options of one destination, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    options: Vec<DestOption>,
    unknown: Vec<String>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds raw values to the declared options. Raw keys no declaration
    /// consumes are remembered and reported by [`unknown_keys`](Self::unknown_keys).
    pub fn from_raw(declarations: Vec<DestOption>, raw: &RawOptions) -> Self {
        let mut set = Self::new();
        for mut option in declarations {
            if let Some(value) = raw.get(option.name()) {
                option.raw_value = Some(value.clone());
            }
            set.declare(option);
        }
        set.unknown = raw
            .keys()
            .filter(|key| set.get(key).is_none())
            .cloned()
            .collect();
        set
    }

    /// Adds an option, replacing a previous declaration with the same name.
    pub fn declare(&mut self, option: DestOption) {
        match self.options.iter_mut().find(|o| o.name == option.name) {
            Some(existing) => *existing = option,
            None => self.options.push(option),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DestOption> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(DestOption::value)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get_str(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Validates every option and stops at the first failure, which is
    /// returned unchanged.
    pub fn validate_all(&self) -> Result<(), InvalidOption> {
        self.options.iter().try_for_each(DestOption::validate)
    }
}
