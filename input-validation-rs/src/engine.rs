//! Validation engine
//!
//! Runs a type's declared rules against a value and translates each violation
//! into an error keyed by the JSON path the client used.

use std::any::{type_name, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::errors::{SchemaError, ValidationError, ValidationResult};
use crate::field_map::{FieldPathCache, FieldPathMap, FieldPathMapper};
use crate::interpreter::{self, CustomRule, CustomRules, Violation};
use crate::messages::error_message;
use crate::rules::Rule;
use crate::schema::{TypeSchema, Validatable};
use crate::DEFAULT_MAX_DEPTH;

/// Rule tag and message for one failed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrorDetail {
    pub validator: String,
    pub message: String,
}

/// Validation result keyed by JSON path; empty means valid
pub type FieldErrors = BTreeMap<String, FieldErrorDetail>;

/// Validates values of `Validatable` types
#[derive(Clone, Default)]
pub struct ValidationEngine {
    mapper: FieldPathMapper,
    custom_rules: CustomRules,
}

impl ValidationEngine {
    /// Create an engine memoizing field path maps in `cache`
    pub fn new(cache: Arc<FieldPathCache>) -> Self {
        Self {
            mapper: FieldPathMapper::new(cache),
            custom_rules: CustomRules::new(),
        }
    }

    /// Register a custom rule under `name`
    ///
    /// Fields use it through `Rule::Custom(name)` or a bare `name` in tag
    /// notation. Registering a name twice replaces the earlier rule.
    pub fn with_rule<F>(mut self, name: &str, rule: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let rule: CustomRule = Arc::new(rule);
        self.custom_rules.insert(name.to_string(), rule);
        self
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.custom_rules.contains_key(name)
    }

    pub fn mapper(&self) -> &FieldPathMapper {
        &self.mapper
    }

    /// Check a schema for rules that can never be evaluated
    ///
    /// Reports custom rules that are not registered, cross-field rules
    /// referencing fields the type does not have, and rules declared on
    /// embedded fields. Nested schemas are checked as well. Meant to be
    /// called at startup.
    pub fn check_schema(&self, schema: &TypeSchema) -> Result<(), SchemaError> {
        self.check_schema_at(schema, schema.name(), 0)
    }

    fn check_schema_at(&self, schema: &TypeSchema, namespace: &str, depth: usize) -> Result<(), SchemaError> {
        if depth > DEFAULT_MAX_DEPTH {
            return Ok(());
        }

        for field in schema.fields() {
            let field_namespace = format!("{}.{}", namespace, field.name());

            if field.is_embedded() && !field.rules().is_empty() {
                return Err(SchemaError::RulesOnEmbeddedField {
                    field: field_namespace,
                });
            }

            for rule in field.rules() {
                if let Rule::Custom(name) = rule {
                    if !self.has_rule(name) {
                        return Err(SchemaError::UnregisteredRule {
                            rule: name.clone(),
                            field: field_namespace,
                        });
                    }
                }
                if let Some(target) = rule.field_reference() {
                    if schema.field(target).is_none() {
                        return Err(SchemaError::UnknownFieldReference {
                            rule: rule.tag().to_string(),
                            field: field_namespace,
                            target: target.to_string(),
                        });
                    }
                }
            }

            let nested = field
                .field_type()
                .object_schema()
                .or_else(|| field.field_type().element_type().and_then(|e| e.object_schema()));
            if let Some(nested) = nested {
                self.check_schema_at(nested, &field_namespace, depth + 1)?;
            }
        }

        Ok(())
    }

    /// Validate a value
    ///
    /// # Returns
    /// The field errors (empty if the value is valid), or an error if the
    /// value could not be turned into its JSON view
    pub fn validate<T: Validatable>(&self, value: &T) -> ValidationResult<FieldErrors> {
        let json = serde_json::to_value(value)?;
        if !json.is_object() {
            return Err(ValidationError::NotAnObject {
                type_name: type_name::<T>().to_string(),
            });
        }
        Ok(self.validate_value::<T>(&json))
    }

    /// Validate the JSON view of a `T`
    pub fn validate_value<T: Validatable>(&self, json: &Value) -> FieldErrors {
        let schema = T::schema();
        let field_map = self.mapper.get_or_build_for(TypeId::of::<T>(), schema);
        let violations = interpreter::evaluate(schema, json, &self.custom_rules);
        translate(schema.name(), &field_map, violations)
    }
}

impl fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rules: Vec<&str> = self.custom_rules.keys().map(String::as_str).collect();
        rules.sort_unstable();
        f.debug_struct("ValidationEngine")
            .field("cached_types", &self.mapper.cache().len())
            .field("custom_rules", &rules)
            .finish()
    }
}

fn translate(root: &str, field_map: &FieldPathMap, violations: Vec<Violation>) -> FieldErrors {
    let prefix = format!("{}.", root);
    let mut errors = FieldErrors::new();

    for violation in violations {
        let internal = violation
            .namespace
            .strip_prefix(&prefix)
            .unwrap_or(&violation.namespace);

        let key = match field_map.get(internal) {
            Some(external) if !external.is_empty() => external.clone(),
            _ => violation.field.to_lowercase(),
        };

        errors.insert(
            key,
            FieldErrorDetail {
                message: error_message(&violation.tag, &violation.param),
                validator: violation.tag,
            },
        );
    }

    errors
}
