//! Attribute schemas, validators and replace-on-change detection.

use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::value::is_unknown;

/// Element type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    Number,
    List(Box<AttributeType>),
    /// A list of nested objects.
    Block(Vec<Attribute>),
}

/// Value constraints checked before any remote call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// A string must be one of the listed values.
    OneOf(Vec<String>),
    /// Every list element must be one of the listed values.
    SubsetOf(Vec<String>),
    /// A Proxmox style identifier: a letter followed by letters, digits,
    /// `-`, `_` or `.`.
    Identifier,
    /// A list must have at least one element. Leave the attribute unset
    /// instead.
    NonEmpty,
}

impl Validator {
    pub fn one_of<S: ToString>(values: impl IntoIterator<Item = S>) -> Self {
        Validator::OneOf(values.into_iter().map(|v| v.to_string()).collect())
    }

    pub fn subset_of<S: ToString>(values: impl IntoIterator<Item = S>) -> Self {
        Validator::SubsetOf(values.into_iter().map(|v| v.to_string()).collect())
    }

    fn check(&self, path: &str, value: &Json, diagnostics: &mut Diagnostics) {
        match self {
            Validator::OneOf(allowed) => {
                if let Some(s) = value.as_str() {
                    if !allowed.iter().any(|a| a == s) {
                        diagnostics.push(
                            Diagnostic::error(
                                "Invalid attribute value",
                                format!("'{}' must be one of: {}", s, allowed.join(", ")),
                            )
                            .at(path),
                        );
                    }
                }
            }
            Validator::SubsetOf(allowed) => {
                for (i, item) in value.as_array().into_iter().flatten().enumerate() {
                    let Some(s) = item.as_str() else { continue };
                    if !allowed.iter().any(|a| a == s) {
                        diagnostics.push(
                            Diagnostic::error(
                                "Invalid attribute value",
                                format!("'{}' must be one of: {}", s, allowed.join(", ")),
                            )
                            .at(format!("{}[{}]", path, i)),
                        );
                    }
                }
            }
            Validator::NonEmpty => {
                if value.as_array().is_some_and(|items| items.is_empty()) {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid attribute value",
                            "the list must not be empty; leave it unset to use the default",
                        )
                        .at(path),
                    );
                }
            }
            Validator::Identifier => {
                if let Some(s) = value.as_str() {
                    if !is_identifier(s) {
                        diagnostics.push(
                            Diagnostic::error(
                                "Invalid identifier",
                                format!(
                                    "'{}' must start with a letter and contain only letters, digits, '-', '_' or '.'",
                                    s
                                ),
                            )
                            .at(path),
                        );
                    }
                }
            }
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// One attribute of a resource or data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    pub description: &'static str,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Changing the value forces the resource to be replaced.
    pub replace_on_change: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    fn new(name: &'static str, ty: AttributeType) -> Self {
        Self {
            name,
            ty,
            description: "",
            required: false,
            optional: false,
            computed: false,
            replace_on_change: false,
            validators: Vec::new(),
        }
    }

    pub fn required(name: &'static str, ty: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(name, ty)
        }
    }

    pub fn optional(name: &'static str, ty: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(name, ty)
        }
    }

    /// Set only by the provider.
    pub fn computed(name: &'static str, ty: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(name, ty)
        }
    }

    /// Optional; filled in by the provider when left unset.
    pub fn optional_computed(name: &'static str, ty: AttributeType) -> Self {
        Self {
            optional: true,
            computed: true,
            ..Self::new(name, ty)
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace_on_change = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    fn check(&self, path: &str, value: Option<&Json>, plan: bool, diagnostics: &mut Diagnostics) {
        let value = match value {
            None | Some(Json::Null) => {
                if self.required {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("the argument \"{}\" is required", self.name),
                        )
                        .at(path),
                    );
                }
                return;
            }
            Some(v) if is_unknown(v) => return,
            Some(v) => v,
        };

        // Plans carry computed values copied from state.
        if self.computed && !self.optional && !self.required && !plan {
            diagnostics.push(
                Diagnostic::error(
                    "Value for unconfigurable attribute",
                    format!("\"{}\" is computed and cannot be set", self.name),
                )
                .at(path),
            );
            return;
        }

        if !type_matches(&self.ty, path, value, plan, diagnostics) {
            return;
        }
        for validator in &self.validators {
            validator.check(path, value, diagnostics);
        }
    }
}

fn type_matches(
    ty: &AttributeType,
    path: &str,
    value: &Json,
    plan: bool,
    diagnostics: &mut Diagnostics,
) -> bool {
    let mismatch = |diagnostics: &mut Diagnostics, expected: &str| {
        diagnostics.push(
            Diagnostic::error("Incorrect attribute value type", format!("expected {}", expected))
                .at(path),
        );
        false
    };

    match ty {
        AttributeType::String if value.is_string() => true,
        AttributeType::String => mismatch(diagnostics, "a string"),
        AttributeType::Bool if value.is_boolean() => true,
        AttributeType::Bool => mismatch(diagnostics, "a bool"),
        AttributeType::Number if value.is_u64() => true,
        AttributeType::Number => mismatch(diagnostics, "a non-negative number"),
        AttributeType::List(element) => match value.as_array() {
            Some(items) => {
                let mut ok = true;
                for (i, item) in items.iter().enumerate() {
                    ok &= type_matches(element, &format!("{}[{}]", path, i), item, plan, diagnostics);
                }
                ok
            }
            None => mismatch(diagnostics, "a list"),
        },
        AttributeType::Block(attributes) => match value.as_array() {
            Some(items) => {
                let before = diagnostics.len();
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    match item.as_object() {
                        Some(object) => {
                            check_object(attributes, &item_path, object, plan, diagnostics)
                        }
                        None => {
                            mismatch(diagnostics, "an object");
                        }
                    }
                }
                diagnostics.len() == before
            }
            None => mismatch(diagnostics, "a list of objects"),
        },
    }
}

fn check_object(
    attributes: &[Attribute],
    prefix: &str,
    object: &Map<String, Json>,
    plan: bool,
    diagnostics: &mut Diagnostics,
) {
    let join = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        }
    };

    for key in object.keys() {
        if !attributes.iter().any(|a| a.name == key) {
            diagnostics.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("an argument named \"{}\" is not expected here", key),
                )
                .at(join(key)),
            );
        }
    }
    for attribute in attributes {
        attribute.check(&join(attribute.name), object.get(attribute.name), plan, diagnostics);
    }
}

/// Schema of one resource or data source type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub type_name: &'static str,
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(type_name: &'static str, description: &'static str) -> Self {
        Self {
            type_name,
            description,
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Check a configuration document. Unknown values are skipped.
    pub fn validate(&self, config: &Json) -> Diagnostics {
        self.check(config, false)
    }

    /// Like [`Schema::validate`], but computed attributes may carry values.
    pub fn validate_plan(&self, plan: &Json) -> Diagnostics {
        self.check(plan, true)
    }

    fn check(&self, config: &Json, plan: bool) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        match config.as_object() {
            Some(object) => check_object(&self.attributes, "", object, plan, &mut diagnostics),
            None => diagnostics.push(Diagnostic::error(
                "Invalid configuration",
                format!("{} configuration must be an object", self.type_name),
            )),
        }
        diagnostics
    }

    /// Replace-on-change attributes whose proposed value differs from the
    /// prior state. Empty for a resource that does not exist yet.
    pub fn requires_replace(&self, prior: &Json, proposed: &Json) -> Vec<String> {
        let Some(prior) = prior.as_object() else {
            return Vec::new();
        };
        let null = Json::Null;

        self.attributes
            .iter()
            .filter(|a| a.replace_on_change)
            .filter(|a| {
                let before = prior.get(a.name).unwrap_or(&null);
                let after = proposed.get(a.name).unwrap_or(&null);
                if a.computed && after.is_null() {
                    return false;
                }
                is_unknown(after) || before != after
            })
            .map(|a| a.name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new("test_thing", "Test")
            .attribute(
                Attribute::required("id", AttributeType::String)
                    .replace()
                    .validate(Validator::Identifier),
            )
            .attribute(Attribute::computed("mount", AttributeType::String))
            .attribute(
                Attribute::optional_computed(
                    "content_types",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .validate(Validator::subset_of(["images", "rootdir"])),
            )
            .attribute(Attribute::optional(
                "members",
                AttributeType::Block(vec![
                    Attribute::required("id", AttributeType::String),
                    Attribute::required("type", AttributeType::String)
                        .validate(Validator::one_of(["qemu", "storage"])),
                ]),
            ))
    }

    fn paths(diagnostics: &Diagnostics) -> Vec<String> {
        diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect()
    }

    #[test]
    fn test_valid_config() {
        let diagnostics = schema().validate(&json!({
            "id": "lvm1",
            "content_types": ["images"],
            "members": [{"id": "100", "type": "qemu"}]
        }));
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_missing_required_and_unexpected() {
        let diagnostics = schema().validate(&json!({"colour": "red"}));
        assert_eq!(paths(&diagnostics), vec!["colour", "id"]);
    }

    #[test]
    fn test_validators_report_paths() {
        let diagnostics = schema().validate(&json!({
            "id": "1bad",
            "content_types": ["images", "iso"],
            "members": [{"id": "100", "type": "lxc"}]
        }));
        assert!(diagnostics.has_errors());
        assert_eq!(
            paths(&diagnostics),
            vec!["id", "content_types[1]", "members[0].type"]
        );
    }

    #[test]
    fn test_computed_cannot_be_set() {
        let diagnostics = schema().validate(&json!({"id": "a", "mount": "/mnt"}));
        assert_eq!(paths(&diagnostics), vec!["mount"]);

        let diagnostics = schema().validate_plan(&json!({"id": "a", "mount": "/mnt"}));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_values_are_skipped() {
        let diagnostics = schema().validate(&json!({
            "id": {"$unknown": true},
            "content_types": {"$unknown": true}
        }));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_type_mismatch() {
        let diagnostics = schema().validate(&json!({"id": 5, "content_types": "images"}));
        assert_eq!(paths(&diagnostics), vec!["id", "content_types"]);
    }

    #[test]
    fn test_requires_replace() {
        let schema = schema();
        let prior = json!({"id": "a", "content_types": ["images"]});

        assert!(schema.requires_replace(&prior, &json!({"id": "a", "content_types": ["rootdir"]})).is_empty());
        assert_eq!(schema.requires_replace(&prior, &json!({"id": "b"})), vec!["id"]);
        assert!(schema.requires_replace(&Json::Null, &json!({"id": "b"})).is_empty());
    }

    #[test]
    fn test_non_empty_list() {
        let schema = Schema::new("test_list", "Test").attribute(
            Attribute::optional_computed("nodes", AttributeType::List(Box::new(AttributeType::String)))
                .validate(Validator::NonEmpty),
        );

        assert_eq!(paths(&schema.validate(&json!({"nodes": []}))), vec!["nodes"]);
        assert!(schema.validate(&json!({"nodes": ["pve1"]})).is_empty());
        assert!(schema.validate(&json!({})).is_empty());
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("local-lvm"));
        assert!(is_identifier("nfs.backup_1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("-x"));
        assert!(!is_identifier("has space"));
    }
}
