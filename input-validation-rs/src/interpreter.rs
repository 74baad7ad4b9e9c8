//! Rule interpreter
//!
//! Walks the JSON view of a value alongside its `TypeSchema` and reports
//! every failed rule as a `Violation` addressed by internal namespace
//! (`User.Address.City`, `User.Emails[1]`).
//!
//! Per field the rules run in declaration order and evaluation of that field
//! stops at the first failure. Rules before `dive` apply to the field itself,
//! rules after it to each element of a list (or each value of a map). A null
//! or missing value is only checked by `required`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::rules::Rule;
use crate::schema::{FieldType, TypeSchema};
use crate::validators;
use crate::DEFAULT_MAX_DEPTH;

/// Predicate implementing an application-specific rule
pub type CustomRule = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Custom rules by tag
pub type CustomRules = HashMap<String, CustomRule>;

/// A failed rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Rule tag, e.g. `min`
    pub tag: String,
    /// Internal path prefixed with the root type name
    pub namespace: String,
    /// Last namespace segment, e.g. `City` or `Emails[1]`
    pub field: String,
    /// Rule parameter as written in tag notation
    pub param: String,
}

static ANY: FieldType = FieldType::Any;

/// Evaluate all rules of `schema` against `value`
///
/// A value whose JSON view is not an object yields no violations.
pub fn evaluate(schema: &TypeSchema, value: &Value, custom_rules: &CustomRules) -> Vec<Violation> {
    let mut interpreter = Interpreter {
        custom_rules,
        violations: Vec::new(),
    };

    if let Value::Object(object) = value {
        interpreter.walk_object(schema, object, schema.name(), 0);
    }

    interpreter.violations
}

struct Interpreter<'a> {
    custom_rules: &'a CustomRules,
    violations: Vec<Violation>,
}

/// The object a field belongs to, for cross-field rules
#[derive(Clone, Copy)]
struct Scope<'s> {
    schema: &'s TypeSchema,
    object: &'s Map<String, Value>,
}

/// Where a violation is reported
struct Target {
    namespace: String,
    field: String,
}

impl Target {
    fn index(&self, index: impl std::fmt::Display) -> Self {
        Self {
            namespace: format!("{}[{}]", self.namespace, index),
            field: format!("{}[{}]", self.field, index),
        }
    }
}

impl Interpreter<'_> {
    fn walk_object(&mut self, schema: &TypeSchema, object: &Map<String, Value>, namespace: &str, depth: usize) {
        if depth > DEFAULT_MAX_DEPTH {
            log::warn!("Validation of {} stopped at depth {}", namespace, depth);
            return;
        }

        let scope = Scope { schema, object };

        for field in schema.fields() {
            let field_namespace = format!("{}.{}", namespace, field.name());

            if field.is_embedded() {
                if let Some(nested) = field.field_type().object_schema() {
                    self.walk_object(nested, object, &field_namespace, depth + 1);
                }
                continue;
            }

            let value = field.serialized_key().and_then(|key| object.get(key));
            let target = Target {
                namespace: field_namespace,
                field: field.name().to_string(),
            };
            self.check(field.rules(), field.field_type(), value, &target, scope, depth);
        }
    }

    fn check(
        &mut self,
        rules: &[Rule],
        field_type: &FieldType,
        value: Option<&Value>,
        target: &Target,
        scope: Scope<'_>,
        depth: usize,
    ) {
        let (own_rules, element_rules) = match rules.iter().position(|rule| matches!(rule, Rule::Dive)) {
            Some(index) => (&rules[..index], Some(&rules[index + 1..])),
            None => (rules, None),
        };

        let value = value.filter(|v| !v.is_null());

        for rule in own_rules {
            if value.is_none() && !matches!(rule, Rule::Required) {
                continue;
            }
            if !self.passes(rule, field_type, value, scope) {
                self.report(rule, target);
                return;
            }
        }

        let Some(value) = value else {
            return;
        };

        match element_rules {
            Some(element_rules) => self.dive(element_rules, field_type, value, target, scope, depth),
            None => {
                if let (Some(nested), Value::Object(object)) = (field_type.object_schema(), value) {
                    self.walk_object(nested, object, &target.namespace, depth + 1);
                }
            }
        }
    }

    fn dive(
        &mut self,
        rules: &[Rule],
        field_type: &FieldType,
        value: &Value,
        target: &Target,
        scope: Scope<'_>,
        depth: usize,
    ) {
        if depth > DEFAULT_MAX_DEPTH {
            return;
        }

        match value {
            Value::Array(items) => {
                let element_type = field_type.element_type().unwrap_or(&ANY);
                for (index, item) in items.iter().enumerate() {
                    self.check(rules, element_type, Some(item), &target.index(index), scope, depth + 1);
                }
            }
            Value::Object(entries) => {
                for (key, item) in entries {
                    self.check(rules, &ANY, Some(item), &target.index(key), scope, depth + 1);
                }
            }
            _ => {}
        }
    }

    fn report(&mut self, rule: &Rule, target: &Target) {
        self.violations.push(Violation {
            tag: rule.tag().to_string(),
            namespace: target.namespace.clone(),
            field: target.field.clone(),
            param: rule.param(),
        });
    }

    fn passes(&self, rule: &Rule, field_type: &FieldType, value: Option<&Value>, scope: Scope<'_>) -> bool {
        let Some(value) = value else {
            return !matches!(rule, Rule::Required);
        };

        match rule {
            Rule::Required => field_type.is_optional() || !is_zero(value),
            Rule::Min(n) | Rule::Gte(n) => size(value).map_or(false, |s| s >= *n),
            Rule::Max(n) | Rule::Lte(n) => size(value).map_or(false, |s| s <= *n),
            Rule::Len(n) => size(value).map_or(false, |s| s == *n),
            Rule::Lt(n) => size(value).map_or(false, |s| s < *n),
            Rule::Gt(n) => size(value).map_or(false, |s| s > *n),
            Rule::Eq(param) => equals_param(value, param),
            Rule::Ne(param) => !equals_param(value, param),

            Rule::EqField(other) => sibling(scope, other).map_or(false, |s| s == value),
            Rule::NeField(other) => sibling(scope, other).map_or(true, |s| s != value),
            Rule::GtField(other) => compare_sibling(scope, other, field_type, value, |o| o == Ordering::Greater),
            Rule::GteField(other) => compare_sibling(scope, other, field_type, value, |o| o != Ordering::Less),
            Rule::LtField(other) => compare_sibling(scope, other, field_type, value, |o| o == Ordering::Less),
            Rule::LteField(other) => compare_sibling(scope, other, field_type, value, |o| o != Ordering::Greater),

            Rule::OneOf(allowed) => scalar_text(value).map_or(false, |s| allowed.iter().any(|a| *a == s)),

            Rule::Alpha => text(value, validators::is_alpha),
            Rule::AlphaNum => text(value, validators::is_alphanumeric),
            Rule::AlphaNumUnicode => text(value, validators::is_alphanumeric_unicode),
            Rule::Email => text(value, validators::is_email),
            Rule::Url => text(value, validators::is_url),
            Rule::Uri => text(value, validators::is_uri),
            Rule::Uuid => text(value, validators::is_uuid),
            Rule::Uuid3 => text(value, validators::is_uuid3),
            Rule::Uuid4 => text(value, validators::is_uuid4),
            Rule::Uuid5 => text(value, validators::is_uuid5),
            Rule::Isbn => text(value, validators::is_isbn),
            Rule::Isbn10 => text(value, validators::is_isbn10),
            Rule::Isbn13 => text(value, validators::is_isbn13),
            Rule::Ip => text(value, validators::is_ip),
            Rule::Ipv4 => text(value, validators::is_ipv4),
            Rule::Ipv6 => text(value, validators::is_ipv6),
            Rule::Mac => text(value, validators::is_mac),
            Rule::Cidr => text(value, validators::is_cidr),
            Rule::Cidrv4 => text(value, validators::is_cidrv4),
            Rule::Cidrv6 => text(value, validators::is_cidrv6),

            Rule::Contains(needle) => text(value, |s| s.contains(needle.as_str())),
            Rule::Excludes(needle) => text(value, |s| !s.contains(needle.as_str())),
            Rule::StartsWith(prefix) => text(value, |s| s.starts_with(prefix.as_str())),
            Rule::EndsWith(suffix) => text(value, |s| s.ends_with(suffix.as_str())),

            Rule::Dive => true,
            Rule::Custom(name) => match self.custom_rules.get(name) {
                Some(rule) => rule(value),
                None => {
                    log::warn!("Custom validation rule '{}' is not registered", name);
                    false
                }
            },
        }
    }
}

/// Zero value of a scalar type; lists and objects are never zero
fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(b) => !b,
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Characters of a string, the value of a number, entries of a collection
fn size(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Number(n) => n.as_f64(),
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(entries) => Some(entries.len() as f64),
        Value::Bool(_) | Value::Null => None,
    }
}

fn equals_param(value: &Value, param: &str) -> bool {
    match value {
        Value::String(s) => s == param,
        Value::Bool(b) => param.parse::<bool>().map_or(false, |p| p == *b),
        Value::Number(_) | Value::Array(_) | Value::Object(_) => param
            .parse::<f64>()
            .ok()
            .zip(size(value))
            .map_or(false, |(p, s)| p == s),
        Value::Null => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text(value: &Value, check: impl Fn(&str) -> bool) -> bool {
    value.as_str().map_or(false, check)
}

fn sibling<'s>(scope: Scope<'s>, name: &str) -> Option<&'s Value> {
    let field = scope.schema.field(name)?;
    let key = field.serialized_key()?;
    scope.object.get(key).filter(|v| !v.is_null())
}

fn compare_sibling(
    scope: Scope<'_>,
    other: &str,
    field_type: &FieldType,
    value: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    let Some(other_value) = sibling(scope, other) else {
        return false;
    };

    let ordering = match (field_type.unwrap_optional(), value, other_value) {
        // RFC 3339 timestamps in the same offset order lexically
        (FieldType::Time, Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (_, Value::Number(a), Value::Number(b)) => a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)),
        (_, a, b) => size(a).zip(size(b)).and_then(|(a, b)| a.partial_cmp(&b)),
    };

    ordering.map_or(false, accept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, Validatable};
    use once_cell::sync::Lazy;
    use serde::Serialize;
    use serde_json::json;

    fn run(schema: &TypeSchema, value: Value) -> Vec<(String, String)> {
        evaluate(schema, &value, &CustomRules::new())
            .into_iter()
            .map(|v| (v.namespace, v.tag))
            .collect()
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(ns, tag)| (ns.to_string(), tag.to_string()))
            .collect()
    }

    #[derive(Serialize)]
    struct Address {
        city: String,
    }

    impl Validatable for Address {
        fn schema() -> &'static TypeSchema {
            static SCHEMA: Lazy<TypeSchema> = Lazy::new(|| {
                TypeSchema::builder("Address")
                    .field(FieldSchema::string("City").tag("c").rule(Rule::Required))
                    .field(FieldSchema::string("Zip").tag("z").rule(Rule::Len(5.0)))
                    .build()
            });
            &SCHEMA
        }
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let schema = TypeSchema::builder("User")
            .field(FieldSchema::string("Name").tag("name").rules(Rule::parse_tags("required,min=2,max=10").unwrap()))
            .build();

        assert_eq!(run(&schema, json!({"name": ""})), pairs(&[("User.Name", "required")]));
        assert_eq!(run(&schema, json!({"name": "J"})), pairs(&[("User.Name", "min")]));
        assert_eq!(run(&schema, json!({"name": "Jonathan Doe"})), pairs(&[("User.Name", "max")]));
        assert!(run(&schema, json!({"name": "John"})).is_empty());
    }

    #[test]
    fn test_numbers_use_their_value() {
        let schema = TypeSchema::builder("User")
            .field(FieldSchema::integer("Age").tag("age").rule(Rule::Min(18.0)).rule(Rule::Max(100.0)))
            .field(FieldSchema::integer("Count").tag("count").rule(Rule::Required))
            .build();

        assert_eq!(
            run(&schema, json!({"age": 17, "count": 0})),
            pairs(&[("User.Age", "min"), ("User.Count", "required")])
        );
        assert!(run(&schema, json!({"age": 25, "count": 1})).is_empty());
    }

    #[test]
    fn test_null_only_checked_by_required() {
        let schema = TypeSchema::builder("Profile")
            .field(FieldSchema::string("Bio").tag("bio").optional().rule(Rule::Min(3.0)))
            .field(FieldSchema::string("Name").tag("name").optional().rule(Rule::Required))
            .build();

        assert_eq!(run(&schema, json!({"bio": null, "name": null})), pairs(&[("Profile.Name", "required")]));
        // optional fields only need to be present
        assert!(run(&schema, json!({"name": ""})).is_empty());
    }

    #[test]
    fn test_nested_objects_are_walked() {
        let schema = TypeSchema::builder("UserWithAddress")
            .field(FieldSchema::string("Name").tag("name").rule(Rule::Required))
            .field(FieldSchema::object::<Address>("Address").tag("a").optional().rule(Rule::Required))
            .build();

        assert_eq!(
            run(&schema, json!({"name": "ok", "a": {"c": "", "z": "123"}})),
            pairs(&[
                ("UserWithAddress.Address.City", "required"),
                ("UserWithAddress.Address.Zip", "len"),
            ])
        );
        assert_eq!(
            run(&schema, json!({"name": "ok", "a": null})),
            pairs(&[("UserWithAddress.Address", "required")])
        );
    }

    #[test]
    fn test_dive_checks_each_element() {
        let schema = TypeSchema::builder("Emails")
            .field(
                FieldSchema::array("Emails", FieldType::String)
                    .rules(Rule::parse_tags("required,min=1,dive,email").unwrap()),
            )
            .build();

        let violations = evaluate(
            &schema,
            &json!({"emails": ["good@email.com", "bad-email"]}),
            &CustomRules::new(),
        );
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].namespace, "Emails.Emails[1]");
        assert_eq!(violations[0].field, "Emails[1]");
        assert_eq!(violations[0].tag, "email");

        assert_eq!(run(&schema, json!({"emails": []})), pairs(&[("Emails.Emails", "min")]));
    }

    #[test]
    fn test_lists_of_objects_need_dive() {
        let without_dive = TypeSchema::builder("Book")
            .field(FieldSchema::array("Addresses", FieldType::object::<Address>()).tag("addresses"))
            .build();
        let with_dive = TypeSchema::builder("Book")
            .field(
                FieldSchema::array("Addresses", FieldType::object::<Address>())
                    .tag("addresses")
                    .rule(Rule::Dive),
            )
            .build();
        let input = json!({"addresses": [{"c": "x", "z": "12345"}, {"c": "", "z": "12345"}]});

        assert!(run(&without_dive, input.clone()).is_empty());
        assert_eq!(run(&with_dive, input), pairs(&[("Book.Addresses[1].City", "required")]));
    }

    #[test]
    fn test_cross_field_rules() {
        let schema = TypeSchema::builder("Signup")
            .field(FieldSchema::string("Password").tag("password"))
            .field(FieldSchema::string("Confirm").tag("confirm").rule(Rule::EqField("Password".into())))
            .field(FieldSchema::integer("Start").tag("start"))
            .field(FieldSchema::integer("End").tag("end").rule(Rule::GtField("Start".into())))
            .build();

        assert!(run(&schema, json!({"password": "a", "confirm": "a", "start": 1, "end": 2})).is_empty());
        assert_eq!(
            run(&schema, json!({"password": "a", "confirm": "b", "start": 2, "end": 2})),
            pairs(&[("Signup.Confirm", "eqfield"), ("Signup.End", "gtfield")])
        );
    }

    #[test]
    fn test_time_fields_compare_chronologically() {
        let schema = TypeSchema::builder("Window")
            .field(FieldSchema::time("From").tag("from"))
            .field(FieldSchema::time("To").tag("to").rule(Rule::GteField("From".into())))
            .build();

        assert!(run(&schema, json!({"from": "2024-01-01T00:00:00Z", "to": "2024-02-01T00:00:00Z"})).is_empty());
        assert_eq!(
            run(&schema, json!({"from": "2024-03-01T00:00:00Z", "to": "2024-02-01T00:00:00Z"})),
            pairs(&[("Window.To", "gtefield")])
        );
    }

    #[test]
    fn test_string_and_set_rules() {
        let schema = TypeSchema::builder("Item")
            .field(FieldSchema::string("Color").tag("color").rule(Rule::OneOf(vec!["red".into(), "blue".into()])))
            .field(FieldSchema::string("Sku").tag("sku").rule(Rule::StartsWith("SKU-".into())))
            .field(FieldSchema::integer("Size").tag("size").rule(Rule::OneOf(vec!["1".into(), "2".into()])))
            .field(FieldSchema::string("Host").tag("host").rule(Rule::Ipv4))
            .build();

        assert!(run(&schema, json!({"color": "red", "sku": "SKU-1", "size": 2, "host": "10.0.0.1"})).is_empty());
        assert_eq!(
            run(&schema, json!({"color": "green", "sku": "1", "size": 3, "host": "::1"})),
            pairs(&[
                ("Item.Color", "oneof"),
                ("Item.Sku", "startswith"),
                ("Item.Size", "oneof"),
                ("Item.Host", "ipv4"),
            ])
        );
    }

    #[test]
    fn test_custom_rules() {
        let schema = TypeSchema::builder("CustomTagStruct")
            .field(FieldSchema::string("Foo").tag("foo").rule(Rule::Custom("foo".into())))
            .build();

        let mut custom = CustomRules::new();
        custom.insert("foo".into(), Arc::new(|v: &Value| v.as_str() == Some("foo")));

        assert!(evaluate(&schema, &json!({"foo": "foo"}), &custom).is_empty());
        let violations = evaluate(&schema, &json!({"foo": "bar"}), &custom);
        assert_eq!(violations[0].tag, "foo");

        // unregistered rules always fail
        let violations = evaluate(&schema, &json!({"foo": "foo"}), &CustomRules::new());
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_non_object_yields_nothing() {
        let schema = TypeSchema::builder("Empty").build();
        assert!(run(&schema, json!([1, 2])).is_empty());
    }
}
