//! Type schemas
//!
//! A `TypeSchema` describes the fields of a data-transfer type: their internal
//! names, the JSON keys they are serialized under, their shapes and the rules
//! that apply to them. Types expose their schema by implementing
//! [`Validatable`], usually from a `once_cell::sync::Lazy` so the schema is
//! built once per process.
//!
//! ```ignore
//! static ADDRESS: Lazy<TypeSchema> = Lazy::new(|| {
//!     TypeSchema::builder("Address")
//!         .field(FieldSchema::string("city").tag("c").rule(Rule::Required))
//!         .field(FieldSchema::string("zip").tag("z").rule(Rule::Len(5.0)))
//!         .build()
//! });
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::rules::Rule;
use crate::DEFAULT_MAX_DEPTH;

/// A type that declares its validation schema
///
/// The schema must describe the type's `Serialize` output: field keys are
/// read from the serialized JSON object.
pub trait Validatable: Serialize + 'static {
    fn schema() -> &'static TypeSchema;
}

/// Deferred reference to a nested type's schema
///
/// A function pointer rather than a reference so that schemas can refer to
/// each other (or to themselves) without initialization order issues.
pub type SchemaRef = fn() -> &'static TypeSchema;

/// Shape of a field's value
#[derive(Clone)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Timestamp serialized as a string; a leaf for path mapping
    Time,
    /// Nested object with its own schema
    Object(SchemaRef),
    /// List of values of the inner type
    Array(Box<FieldType>),
    /// Map with string keys and arbitrary values
    Map,
    Any,
    /// Value that may be absent or null
    Optional(Box<FieldType>),
}

impl FieldType {
    /// Nested object type for `T`
    pub fn object<T: Validatable>() -> Self {
        FieldType::Object(T::schema)
    }

    /// List of `inner`
    pub fn array(inner: FieldType) -> Self {
        FieldType::Array(Box::new(inner))
    }

    /// Optional `inner`
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    /// The type with one level of `Optional` removed
    pub fn unwrap_optional(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner,
            other => other,
        }
    }

    /// Schema of the nested object, if the type (or its optional inner type) is one
    pub fn object_schema(&self) -> Option<&'static TypeSchema> {
        match self.unwrap_optional() {
            FieldType::Object(schema) => Some(schema()),
            _ => None,
        }
    }

    /// Element type of a list, looking through one `Optional`
    pub fn element_type(&self) -> Option<&FieldType> {
        match self.unwrap_optional() {
            FieldType::Array(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Integer => write!(f, "Integer"),
            FieldType::Number => write!(f, "Number"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::Time => write!(f, "Time"),
            FieldType::Object(schema) => write!(f, "Object({})", schema().name()),
            FieldType::Array(inner) => write!(f, "Array({:?})", inner),
            FieldType::Map => write!(f, "Map"),
            FieldType::Any => write!(f, "Any"),
            FieldType::Optional(inner) => write!(f, "Optional({:?})", inner),
        }
    }
}

/// Schema for a single field
#[derive(Debug, Clone)]
pub struct FieldSchema {
    /// Internal name, used in rule namespaces
    name: String,
    /// Lower-cased internal name, the key of an untagged field
    default_key: String,
    /// Declared external name; `"-"` means the field is never serialized
    tag: Option<String>,
    field_type: FieldType,
    rules: Vec<Rule>,
    /// Fields of an embedded object appear directly in the parent object
    embedded: bool,
}

impl FieldSchema {
    /// Create a field of any type
    pub fn new(name: &str, field_type: FieldType) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, field_type)
    }

    /// Create a new string field schema
    pub fn string(name: &str) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::String)
    }

    /// Create a new integer field schema
    pub fn integer(name: &str) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::Integer)
    }

    /// Create a new number field schema
    pub fn number(name: &str) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::Number)
    }

    /// Create a new boolean field schema
    pub fn boolean(name: &str) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::Boolean)
    }

    /// Create a new timestamp field schema
    pub fn time(name: &str) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::Time)
    }

    /// Create a new object field schema
    pub fn object<T: Validatable>(name: &str) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::object::<T>())
    }

    /// Create a new array field schema
    pub fn array(name: &str, item_type: FieldType) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::array(item_type))
    }

    /// Create a new map field schema
    pub fn map(name: &str) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::Map)
    }

    /// Create a new any-type field schema
    pub fn any(name: &str) -> FieldSchemaBuilder {
        FieldSchemaBuilder::new(name, FieldType::Any)
    }

    /// Create an embedded object whose fields are flattened into the parent
    pub fn embedded<T: Validatable>(name: &str) -> FieldSchemaBuilder {
        let mut builder = FieldSchemaBuilder::new(name, FieldType::object::<T>());
        builder.schema.embedded = true;
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Name used in client-facing error paths
    ///
    /// The declared tag when it is non-empty and not `"-"`, otherwise the
    /// lower-cased internal name.
    pub fn external_name(&self) -> String {
        match self.tag.as_deref() {
            Some(tag) if !tag.is_empty() && tag != "-" => tag.to_string(),
            _ => self.default_key.clone(),
        }
    }

    /// Key the field is serialized under, `None` if it is skipped
    ///
    /// Untagged fields use the same lower-cased name as [`external_name`],
    /// so a field is read under the key its errors are reported at.
    ///
    /// [`external_name`]: FieldSchema::external_name
    pub fn serialized_key(&self) -> Option<&str> {
        match self.tag.as_deref() {
            Some("-") => None,
            Some(tag) if !tag.is_empty() => Some(tag),
            _ => Some(&self.default_key),
        }
    }
}

/// Builder for field schemas
#[derive(Debug)]
pub struct FieldSchemaBuilder {
    schema: FieldSchema,
}

impl FieldSchemaBuilder {
    fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            schema: FieldSchema {
                name: name.to_string(),
                default_key: name.to_lowercase(),
                tag: None,
                field_type,
                rules: Vec::new(),
                embedded: false,
            },
        }
    }

    /// Set the external name (the serde rename of the field)
    pub fn tag(mut self, tag: &str) -> Self {
        self.schema.tag = Some(tag.to_string());
        self
    }

    /// Wrap the field's type in `Optional`
    pub fn optional(mut self) -> Self {
        if !self.schema.field_type.is_optional() {
            self.schema.field_type = FieldType::optional(self.schema.field_type);
        }
        self
    }

    /// Append a rule
    pub fn rule(mut self, rule: Rule) -> Self {
        self.schema.rules.push(rule);
        self
    }

    /// Append several rules in order
    pub fn rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = Rule>,
    {
        self.schema.rules.extend(rules);
        self
    }

    /// Build the field schema
    pub fn build(self) -> FieldSchema {
        self.schema
    }
}

impl From<FieldSchemaBuilder> for FieldSchema {
    fn from(builder: FieldSchemaBuilder) -> Self {
        builder.build()
    }
}

/// Schema for a data-transfer type
#[derive(Debug, Clone)]
pub struct TypeSchema {
    name: String,
    fields: Vec<FieldSchema>,
}

impl TypeSchema {
    /// Create a builder for a type called `name`
    pub fn builder(name: &str) -> TypeSchemaBuilder {
        TypeSchemaBuilder {
            schema: TypeSchema {
                name: name.to_string(),
                fields: Vec::new(),
            },
        }
    }

    /// Type name, the first segment of every rule namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Find a field by internal name, looking into embedded objects
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name).or_else(|| {
            self.fields
                .iter()
                .filter(|f| f.embedded)
                .filter_map(|f| f.field_type.object_schema())
                .find_map(|schema| schema.field(name))
        })
    }

    /// Keys accepted at this object's level, including flattened embedded keys
    fn accepted_keys(&self, depth: usize) -> HashSet<&str> {
        let mut keys = HashSet::new();
        for field in &self.fields {
            if field.embedded {
                if let Some(schema) = field.field_type.object_schema() {
                    if depth < DEFAULT_MAX_DEPTH {
                        keys.extend(schema.accepted_keys(depth + 1));
                    }
                }
            } else if let Some(key) = field.serialized_key() {
                keys.insert(key);
            }
        }
        keys
    }

    /// Find the first key in `value` that no field of this schema accepts
    ///
    /// Nested objects, optional objects and lists of objects are checked
    /// recursively. Returns the dotted JSON path of the offending key.
    pub fn find_unknown_field(&self, value: &Value) -> Option<String> {
        match value {
            Value::Object(object) => self.unknown_in_object(object, "", 0),
            _ => None,
        }
    }

    fn unknown_in_object(&self, object: &Map<String, Value>, prefix: &str, depth: usize) -> Option<String> {
        if depth > DEFAULT_MAX_DEPTH {
            return None;
        }

        let accepted = self.accepted_keys(depth);
        if let Some(key) = object.keys().find(|key| !accepted.contains(key.as_str())) {
            return Some(join_path(prefix, key));
        }

        self.unknown_in_children(object, prefix, depth)
    }

    fn unknown_in_children(&self, object: &Map<String, Value>, prefix: &str, depth: usize) -> Option<String> {
        for field in &self.fields {
            if field.embedded {
                if let Some(schema) = field.field_type.object_schema() {
                    if let Some(found) = schema.unknown_in_children(object, prefix, depth + 1) {
                        return Some(found);
                    }
                }
                continue;
            }

            let Some(key) = field.serialized_key() else {
                continue;
            };
            let Some(child) = object.get(key) else {
                continue;
            };
            let path = join_path(prefix, key);

            if let (Some(schema), Value::Object(nested)) = (field.field_type.object_schema(), child) {
                if let Some(found) = schema.unknown_in_object(nested, &path, depth + 1) {
                    return Some(found);
                }
            }

            if let (Some(element), Value::Array(items)) = (field.field_type.element_type(), child) {
                if let Some(schema) = element.object_schema() {
                    for (index, item) in items.iter().enumerate() {
                        if let Value::Object(nested) = item {
                            let item_path = format!("{}[{}]", path, index);
                            if let Some(found) = schema.unknown_in_object(nested, &item_path, depth + 1) {
                                return Some(found);
                            }
                        }
                    }
                }
            }
        }
        None
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Builder for type schemas
#[derive(Debug)]
pub struct TypeSchemaBuilder {
    schema: TypeSchema,
}

impl TypeSchemaBuilder {
    /// Add a field
    pub fn field(mut self, field: impl Into<FieldSchema>) -> Self {
        self.schema.fields.push(field.into());
        self
    }

    /// Build the schema
    pub fn build(self) -> TypeSchema {
        self.schema
    }
}
