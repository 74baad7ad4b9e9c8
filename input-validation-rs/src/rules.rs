//! Declarative field rules
//!
//! A `Rule` is attached to a field in its `FieldSchema`. Rules are written
//! either as enum values or in the compact tag notation
//! (`"required,min=2,max=10"`, `"required,dive,email"`) parsed by
//! [`Rule::parse_tags`]. Rules listed after `dive` apply to each element of a
//! list instead of the list itself.

use std::fmt;

use crate::errors::SchemaError;

/// A single validation rule with its parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Value must be present and not the zero value of its type
    Required,
    /// Lower bound: characters for strings, items for lists, value for numbers
    Min(f64),
    /// Upper bound, measured like `Min`
    Max(f64),
    /// Exact size, measured like `Min`
    Len(f64),
    Eq(String),
    Ne(String),
    Lt(f64),
    Lte(f64),
    Gt(f64),
    Gte(f64),
    /// Comparisons against a sibling field, named by its internal name
    EqField(String),
    NeField(String),
    GtField(String),
    GteField(String),
    LtField(String),
    LteField(String),
    OneOf(Vec<String>),
    Alpha,
    AlphaNum,
    AlphaNumUnicode,
    Email,
    Url,
    Uri,
    Uuid,
    Uuid3,
    Uuid4,
    Uuid5,
    Isbn,
    Isbn10,
    Isbn13,
    Contains(String),
    Excludes(String),
    StartsWith(String),
    EndsWith(String),
    Ip,
    Ipv4,
    Ipv6,
    Mac,
    Cidr,
    Cidrv4,
    Cidrv6,
    /// Separates list rules from per-element rules
    Dive,
    /// Rule implemented by a function registered on the engine
    Custom(String),
}

impl Rule {
    /// The tag under which violations of this rule are reported
    pub fn tag(&self) -> &str {
        match self {
            Rule::Required => "required",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Len(_) => "len",
            Rule::Eq(_) => "eq",
            Rule::Ne(_) => "ne",
            Rule::Lt(_) => "lt",
            Rule::Lte(_) => "lte",
            Rule::Gt(_) => "gt",
            Rule::Gte(_) => "gte",
            Rule::EqField(_) => "eqfield",
            Rule::NeField(_) => "nefield",
            Rule::GtField(_) => "gtfield",
            Rule::GteField(_) => "gtefield",
            Rule::LtField(_) => "ltfield",
            Rule::LteField(_) => "ltefield",
            Rule::OneOf(_) => "oneof",
            Rule::Alpha => "alpha",
            Rule::AlphaNum => "alphanum",
            Rule::AlphaNumUnicode => "alphanumunicode",
            Rule::Email => "email",
            Rule::Url => "url",
            Rule::Uri => "uri",
            Rule::Uuid => "uuid",
            Rule::Uuid3 => "uuid3",
            Rule::Uuid4 => "uuid4",
            Rule::Uuid5 => "uuid5",
            Rule::Isbn => "isbn",
            Rule::Isbn10 => "isbn10",
            Rule::Isbn13 => "isbn13",
            Rule::Contains(_) => "contains",
            Rule::Excludes(_) => "excludes",
            Rule::StartsWith(_) => "startswith",
            Rule::EndsWith(_) => "endswith",
            Rule::Ip => "ip",
            Rule::Ipv4 => "ipv4",
            Rule::Ipv6 => "ipv6",
            Rule::Mac => "mac",
            Rule::Cidr => "cidr",
            Rule::Cidrv4 => "cidrv4",
            Rule::Cidrv6 => "cidrv6",
            Rule::Dive => "dive",
            Rule::Custom(name) => name,
        }
    }

    /// The parameter as it appears in tag notation, empty if the rule has none
    pub fn param(&self) -> String {
        match self {
            Rule::Min(n) | Rule::Max(n) | Rule::Len(n) => n.to_string(),
            Rule::Lt(n) | Rule::Lte(n) | Rule::Gt(n) | Rule::Gte(n) => n.to_string(),
            Rule::Eq(s) | Rule::Ne(s) => s.clone(),
            Rule::EqField(f)
            | Rule::NeField(f)
            | Rule::GtField(f)
            | Rule::GteField(f)
            | Rule::LtField(f)
            | Rule::LteField(f) => f.clone(),
            Rule::OneOf(values) => values.join(" "),
            Rule::Contains(s) | Rule::Excludes(s) | Rule::StartsWith(s) | Rule::EndsWith(s) => {
                s.clone()
            }
            _ => String::new(),
        }
    }

    /// The sibling field a cross-field rule compares against
    pub fn field_reference(&self) -> Option<&str> {
        match self {
            Rule::EqField(f)
            | Rule::NeField(f)
            | Rule::GtField(f)
            | Rule::GteField(f)
            | Rule::LtField(f)
            | Rule::LteField(f) => Some(f),
            _ => None,
        }
    }

    /// Parse a comma-separated tag string into rules
    ///
    /// Unknown rule names without a parameter become [`Rule::Custom`] so that
    /// application-specific rules can be declared the same way as built-ins;
    /// whether they are registered is checked by the engine.
    pub fn parse_tags(tags: &str) -> Result<Vec<Rule>, SchemaError> {
        tags.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(Rule::parse_one)
            .collect()
    }

    fn parse_one(tag: &str) -> Result<Rule, SchemaError> {
        let (name, param) = match tag.split_once('=') {
            Some((name, param)) => (name.trim(), Some(param.trim())),
            None => (tag, None),
        };

        let rule = match name {
            "required" => Rule::Required,
            "min" => Rule::Min(number(name, param)?),
            "max" => Rule::Max(number(name, param)?),
            "len" => Rule::Len(number(name, param)?),
            "eq" => Rule::Eq(text(name, param)?),
            "ne" => Rule::Ne(text(name, param)?),
            "lt" => Rule::Lt(number(name, param)?),
            "lte" => Rule::Lte(number(name, param)?),
            "gt" => Rule::Gt(number(name, param)?),
            "gte" => Rule::Gte(number(name, param)?),
            "eqfield" => Rule::EqField(text(name, param)?),
            "nefield" => Rule::NeField(text(name, param)?),
            "gtfield" => Rule::GtField(text(name, param)?),
            "gtefield" => Rule::GteField(text(name, param)?),
            "ltfield" => Rule::LtField(text(name, param)?),
            "ltefield" => Rule::LteField(text(name, param)?),
            "oneof" => Rule::OneOf(
                text(name, param)?
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            ),
            "alpha" => Rule::Alpha,
            "alphanum" => Rule::AlphaNum,
            "alphanumunicode" => Rule::AlphaNumUnicode,
            "email" => Rule::Email,
            "url" => Rule::Url,
            "uri" => Rule::Uri,
            "uuid" => Rule::Uuid,
            "uuid3" => Rule::Uuid3,
            "uuid4" => Rule::Uuid4,
            "uuid5" => Rule::Uuid5,
            "isbn" => Rule::Isbn,
            "isbn10" => Rule::Isbn10,
            "isbn13" => Rule::Isbn13,
            "contains" => Rule::Contains(text(name, param)?),
            "excludes" => Rule::Excludes(text(name, param)?),
            "startswith" => Rule::StartsWith(text(name, param)?),
            "endswith" => Rule::EndsWith(text(name, param)?),
            "ip" => Rule::Ip,
            "ipv4" => Rule::Ipv4,
            "ipv6" => Rule::Ipv6,
            "mac" => Rule::Mac,
            "cidr" => Rule::Cidr,
            "cidrv4" => Rule::Cidrv4,
            "cidrv6" => Rule::Cidrv6,
            "dive" => Rule::Dive,
            custom if param.is_none() && is_identifier(custom) => Rule::Custom(custom.to_string()),
            other => return Err(SchemaError::UnknownRule(other.to_string())),
        };

        Ok(rule)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let param = self.param();
        if param.is_empty() {
            write!(f, "{}", self.tag())
        } else {
            write!(f, "{}={}", self.tag(), param)
        }
    }
}

fn text(rule: &str, param: Option<&str>) -> Result<String, SchemaError> {
    match param {
        Some(p) if !p.is_empty() => Ok(p.to_string()),
        _ => Err(SchemaError::MissingParam {
            rule: rule.to_string(),
        }),
    }
}

fn number(rule: &str, param: Option<&str>) -> Result<f64, SchemaError> {
    let raw = text(rule, param)?;
    raw.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or(SchemaError::InvalidParam {
            rule: rule.to_string(),
            param: raw,
        })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
