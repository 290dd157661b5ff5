//! Walking JSON Schemas along YAML paths.

use std::borrow::Cow;

use serde_json::Value;

use super::outline::PathSegment;

/// Bound on `$ref`/composition nesting, guards against cyclic schemas.
const MAX_DEPTH: usize = 32;

/// Navigates a schema document, following local `$ref`s and composition
/// keywords (`allOf`, `anyOf`, `oneOf`).
pub struct SchemaNavigator<'a> {
    root: &'a Value,
}

impl<'a> SchemaNavigator<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// `schema` plus every schema it is composed of, with references resolved.
    pub fn expand(&self, schema: &'a Value) -> Vec<&'a Value> {
        let mut out = Vec::new();
        self.expand_into(schema, 0, &mut out);
        out
    }

    fn expand_into(&self, schema: &'a Value, depth: usize, out: &mut Vec<&'a Value>) {
        if depth > MAX_DEPTH {
            return;
        }
        let schema = self.resolve_ref(schema);
        out.push(schema);
        for keyword in ["allOf", "anyOf", "oneOf"] {
            if let Some(branches) = schema.get(keyword).and_then(Value::as_array) {
                for branch in branches {
                    self.expand_into(branch, depth + 1, out);
                }
            }
        }
    }

    /// Follow a chain of local `$ref`s. Remote and dangling refs stop the walk.
    fn resolve_ref(&self, mut schema: &'a Value) -> &'a Value {
        for _ in 0..MAX_DEPTH {
            let Some(reference) = schema.get("$ref").and_then(Value::as_str) else {
                break;
            };
            let Some(pointer) = reference.strip_prefix('#') else {
                break;
            };
            match self.root.pointer(pointer) {
                Some(target) => schema = target,
                None => break,
            }
        }
        schema
    }

    /// Candidate schemas for the value at `path`.
    pub fn at_path(&self, path: &[PathSegment]) -> Vec<&'a Value> {
        let mut current = self.expand(self.root);
        for segment in path {
            let mut next = Vec::new();
            for schema in &current {
                match segment {
                    PathSegment::Key(key) => {
                        if let Some(property) = schema
                            .get("properties")
                            .and_then(|props| props.get(key.as_str()))
                        {
                            next.extend(self.expand(property));
                        } else if let Some(extra) = schema
                            .get("additionalProperties")
                            .filter(|v| v.is_object())
                        {
                            next.extend(self.expand(extra));
                        }
                    }
                    PathSegment::Index(index) => match schema.get("items") {
                        Some(Value::Array(items)) => {
                            if let Some(item) = items.get(*index) {
                                next.extend(self.expand(item));
                            }
                        }
                        Some(item @ Value::Object(_)) => next.extend(self.expand(item)),
                        _ => {}
                    },
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

/// Declared properties of `candidates`, first declaration wins.
pub fn properties<'a>(candidates: &[&'a Value]) -> Vec<(&'a str, &'a Value)> {
    let mut seen = Vec::new();
    for schema in candidates {
        let Some(props) = schema.get("properties").and_then(Value::as_object) else {
            continue;
        };
        for (name, property) in props {
            if !seen.iter().any(|(existing, _)| *existing == name.as_str()) {
                seen.push((name.as_str(), property));
            }
        }
    }
    seen
}

/// Human readable `type` of a schema.
pub fn type_label(schema: &Value) -> Option<String> {
    match schema.get("type")? {
        Value::String(kind) => Some(kind.clone()),
        Value::Array(kinds) => Some(
            kinds
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" | "),
        ),
        _ => None,
    }
}

/// True if the schema allows `kind` as its `type`.
pub fn allows_type(schema: &Value, kind: &str) -> bool {
    match schema.get("type") {
        Some(Value::String(declared)) => declared == kind,
        Some(Value::Array(declared)) => declared.iter().any(|d| d.as_str() == Some(kind)),
        _ => false,
    }
}

/// Restrict a root `oneOf`/`anyOf` schema to the branch describing `kind`.
///
/// Kubernetes-style schemas list every resource as a root branch; each branch
/// pins the `kind` property with an `enum` or `const`. Returns the schema
/// unchanged when no branch matches.
pub fn narrow_for_kind<'a>(root: &'a Value, kind: &str) -> Cow<'a, Value> {
    let navigator = SchemaNavigator::new(root);
    for keyword in ["oneOf", "anyOf"] {
        let Some(branches) = root.get(keyword).and_then(Value::as_array) else {
            continue;
        };
        let matching = branches.iter().find(|branch| {
            navigator
                .expand(branch)
                .iter()
                .filter_map(|schema| schema.get("properties")?.get("kind"))
                .any(|kind_schema| pins_kind(kind_schema, kind))
        });
        if let Some(branch) = matching {
            let mut narrowed = root.clone();
            narrowed[keyword] = Value::Array(vec![branch.clone()]);
            return Cow::Owned(narrowed);
        }
    }
    Cow::Borrowed(root)
}

fn pins_kind(kind_schema: &Value, kind: &str) -> bool {
    let in_enum = kind_schema
        .get("enum")
        .and_then(Value::as_array)
        .is_some_and(|values| values.iter().any(|v| v.as_str() == Some(kind)));
    in_enum || kind_schema.get("const").and_then(Value::as_str) == Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> PathSegment {
        PathSegment::Key(name.to_string())
    }

    #[test]
    fn test_at_path_follows_properties_and_refs() {
        let schema = json!({
            "type": "object",
            "properties": {
                "spec": { "$ref": "#/definitions/Spec" }
            },
            "definitions": {
                "Spec": {
                    "type": "object",
                    "properties": { "replicas": { "type": "integer" } }
                }
            }
        });
        let nav = SchemaNavigator::new(&schema);

        let found = nav.at_path(&[key("spec"), key("replicas")]);

        assert_eq!(found, vec![&json!({ "type": "integer" })]);
    }

    #[test]
    fn test_at_path_through_items_and_composition() {
        let schema = json!({
            "properties": {
                "steps": {
                    "type": "array",
                    "items": {
                        "allOf": [
                            { "properties": { "name": { "type": "string" } } },
                            { "properties": { "run": { "type": "string" } } }
                        ]
                    }
                }
            }
        });
        let nav = SchemaNavigator::new(&schema);

        let item = nav.at_path(&[key("steps"), PathSegment::Index(3)]);
        let names: Vec<_> = properties(&item).into_iter().map(|(n, _)| n).collect();

        assert_eq!(names, vec!["name", "run"]);
    }

    #[test]
    fn test_additional_properties_schema() {
        let schema = json!({
            "additionalProperties": { "type": "object", "properties": { "x": {} } }
        });
        let nav = SchemaNavigator::new(&schema);

        let found = nav.at_path(&[key("anything")]);

        assert_eq!(found.len(), 1);
        assert!(found[0].get("properties").is_some());
    }

    #[test]
    fn test_cyclic_refs_terminate() {
        let schema = json!({
            "definitions": { "A": { "$ref": "#/definitions/A" } },
            "$ref": "#/definitions/A"
        });
        let nav = SchemaNavigator::new(&schema);
        assert_eq!(nav.expand(&schema).len(), 1);
    }

    #[test]
    fn test_type_label_and_allows_type() {
        assert_eq!(type_label(&json!({ "type": "string" })), Some("string".to_string()));
        assert_eq!(
            type_label(&json!({ "type": ["string", "null"] })),
            Some("string | null".to_string())
        );
        assert!(allows_type(&json!({ "type": ["boolean", "null"] }), "boolean"));
        assert!(!allows_type(&json!({}), "boolean"));
    }

    #[test]
    fn test_narrow_for_kind_picks_matching_branch() {
        let schema = json!({
            "oneOf": [
                { "$ref": "#/definitions/Pod" },
                { "$ref": "#/definitions/Service" }
            ],
            "definitions": {
                "Pod": { "properties": { "kind": { "enum": ["Pod"] } } },
                "Service": { "properties": { "kind": { "const": "Service" } } }
            }
        });

        let narrowed = narrow_for_kind(&schema, "Service");
        assert_eq!(narrowed["oneOf"], json!([{ "$ref": "#/definitions/Service" }]));
        assert!(narrowed.get("definitions").is_some());

        let untouched = narrow_for_kind(&schema, "Deployment");
        assert!(matches!(untouched, Cow::Borrowed(_)));
    }
}
