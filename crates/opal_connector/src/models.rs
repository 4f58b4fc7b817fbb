//! Wire models for the opal REST API.
//!
//! Unknown fields are ignored everywhere so that newer opal servers can add
//! attributes without breaking the connector.

use serde::Deserialize;

/// Modification timestamps opal attaches to datasources and value sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub last_update: Option<String>,
}

/// A named grouping of tables on the opal server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpalDatasource {
    pub name: String,
    #[serde(rename = "table", default)]
    pub table_names: Vec<String>,
    #[serde(rename = "type", default)]
    pub datasource_type: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
}

/// One column of an opal table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpalVariable {
    pub name: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    /// Opal value type tag. Unrecognized tags degrade to text downstream.
    #[serde(default)]
    pub value_type: String,
    /// Whether the variable holds a list of values per record.
    #[serde(default)]
    pub repeatable: bool,
    /// Declared position of the variable within raw record cells.
    #[serde(default)]
    pub index: i32,
}

/// Envelope returned by the valueSets endpoint: the variable name order the
/// raw cells are aligned with, plus the records themselves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSets {
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub value_sets: Vec<ValueSet>,
}

/// One row of opal entity data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueSet {
    pub identifier: String,
    #[serde(default)]
    pub values: Vec<RawValue>,
    #[serde(default)]
    pub timestamps: Option<Timestamps>,
}

/// One raw value cell of a value set.
///
/// The wire format is one of three alternative object shapes. Variant order
/// matters: a cell carrying several of the keys resolves with the same
/// precedence opal documents (length, then value, then values). Anything
/// else ends up in `Unknown` and is treated as absent by extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Sized binary data, only the length is shipped.
    Binary { length: serde_json::Value },
    /// A single scalar value.
    Scalar { value: serde_json::Value },
    /// Values of a repeatable variable.
    Sequence { values: Vec<RawValue> },
    /// Unrecognized cell shape.
    Unknown(serde_json::Value),
}

/// A (locale, text) pair used for translated fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocaleText {
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A taxonomy from the opal system configuration, with its nested
/// vocabularies and terms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub title: Vec<LocaleText>,
    #[serde(default)]
    pub description: Vec<LocaleText>,
    #[serde(default)]
    pub keywords: Vec<LocaleText>,
    #[serde(default)]
    pub vocabularies: Vec<Vocabulary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Vocabulary {
    pub name: String,
    #[serde(default)]
    pub title: Vec<LocaleText>,
    #[serde(default)]
    pub description: Vec<LocaleText>,
    #[serde(default)]
    pub keywords: Vec<LocaleText>,
    #[serde(default)]
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Term {
    pub name: String,
    #[serde(default)]
    pub title: Vec<LocaleText>,
    #[serde(default)]
    pub description: Vec<LocaleText>,
    #[serde(default)]
    pub keywords: Vec<LocaleText>,
}

/// Plugin packages installed on the opal server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginPackages {
    #[serde(default)]
    pub packages: Vec<PluginPackage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginPackage {
    pub name: String,
    #[serde(rename = "type", default)]
    pub package_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub opal_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserialize_datasource() {
        let ds: OpalDatasource = serde_json::from_value(json!({
            "name": "Study",
            "table": ["Baseline", "FollowUp"],
            "type": "mongodb",
            "timestamps": {"created": "2017-01-01T00:00:00.000", "lastUpdate": "2017-06-01T00:00:00.000"},
            "link": "/datasource/Study"
        }))
        .unwrap();
        assert_eq!(ds.name, "Study");
        assert_eq!(ds.table_names, vec!["Baseline", "FollowUp"]);
        assert_eq!(ds.datasource_type.as_deref(), Some("mongodb"));
        assert!(ds.timestamps.is_some());
    }

    #[test]
    fn deserialize_datasource_without_tables() {
        let ds: OpalDatasource = serde_json::from_value(json!({"name": "Empty"})).unwrap();
        assert!(ds.table_names.is_empty());
    }

    #[test]
    fn deserialize_variable() {
        let var: OpalVariable = serde_json::from_value(json!({
            "name": "age",
            "entityType": "Participant",
            "valueType": "integer",
            "repeatable": false,
            "index": 3
        }))
        .unwrap();
        assert_eq!(var.name, "age");
        assert_eq!(var.value_type, "integer");
        assert!(!var.repeatable);
        assert_eq!(var.index, 3);

        // Absent flags default off.
        let var: OpalVariable = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert!(!var.repeatable);
        assert_eq!(var.index, 0);
        assert_eq!(var.value_type, "");
    }

    #[test]
    fn raw_value_precedence() {
        let v: RawValue = serde_json::from_value(json!({"value": "hello"})).unwrap();
        assert!(matches!(v, RawValue::Scalar { .. }));

        let v: RawValue = serde_json::from_value(json!({"length": 1024})).unwrap();
        assert!(matches!(v, RawValue::Binary { .. }));

        // A binary cell may also ship a value link; length wins.
        let v: RawValue =
            serde_json::from_value(json!({"length": 1024, "value": "/binary/123"})).unwrap();
        assert!(matches!(v, RawValue::Binary { .. }));

        let v: RawValue =
            serde_json::from_value(json!({"values": [{"value": "a"}, {"value": "b"}]})).unwrap();
        assert!(matches!(v, RawValue::Sequence { .. }));

        let v: RawValue = serde_json::from_value(json!({"something": "else"})).unwrap();
        assert!(matches!(v, RawValue::Unknown(_)));
    }

    #[test]
    fn deserialize_value_sets() {
        let vs: ValueSets = serde_json::from_value(json!({
            "entityType": "Participant",
            "variables": ["name", "age"],
            "valueSets": [
                {"identifier": "P1", "values": [{"value": "alice"}, {"value": 42}]},
                {"identifier": "P2", "values": []}
            ]
        }))
        .unwrap();
        assert_eq!(vs.variables, vec!["name", "age"]);
        assert_eq!(vs.value_sets.len(), 2);
        assert_eq!(vs.value_sets[0].identifier, "P1");
        assert_eq!(vs.value_sets[0].values.len(), 2);
    }

    #[test]
    fn deserialize_taxonomy_tree() {
        let taxo: Taxonomy = serde_json::from_value(json!({
            "name": "Mlstr_area",
            "author": "Maelstrom Research",
            "license": "CC BY-NC 4.0",
            "title": [{"locale": "en", "text": "Areas of information"}],
            "vocabularies": [{
                "name": "Cognition",
                "title": [{"locale": "en", "text": "Cognition"}],
                "terms": [{"name": "Memory"}]
            }]
        }))
        .unwrap();
        assert_eq!(taxo.vocabularies.len(), 1);
        assert_eq!(taxo.vocabularies[0].terms[0].name, "Memory");
        assert_eq!(taxo.title[0].locale.as_deref(), Some("en"));
    }

    #[test]
    fn deserialize_plugin_packages() {
        let packages: PluginPackages = serde_json::from_value(json!({
            "packages": [{
                "name": "opal-search-es",
                "type": "search",
                "title": "Elasticsearch",
                "description": "Opal search based on Elasticsearch.",
                "version": "1.2.0",
                "opalVersion": "2.10.0"
            }]
        }))
        .unwrap();
        assert_eq!(packages.packages.len(), 1);
        assert_eq!(packages.packages[0].package_type.as_deref(), Some("search"));
        assert_eq!(packages.packages[0].opal_version.as_deref(), Some("2.10.0"));
    }
}
