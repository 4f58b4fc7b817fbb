//! Administration tables exposed from the opal system configuration.
//!
//! A fixed `system` schema carries the taxonomy/vocabulary/term hierarchy
//! (three flattened projections of one fetched tree) and the installed
//! plugin packages. Requested column names are resolved into selectors once
//! per call; unknown columns always yield null while an unknown system
//! table is a caller bug and fails.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use opal_connector::models::{LocaleText, PluginPackage, Taxonomy, Term, Vocabulary};

use crate::catalog::SchemaTableName;
use crate::datatype::OpalColumnType;
use crate::errors::{DatasourceOpalError, Result};
use crate::values::CellValue;
use crate::OpalFetch;

/// Schema under which the administration tables are exposed.
pub const SYSTEM_SCHEMA: &str = "system";

/// The fixed set of administration tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTable {
    Taxonomy,
    Vocabulary,
    Term,
    Plugins,
}

impl SystemTable {
    pub const ALL: [SystemTable; 4] = [
        SystemTable::Taxonomy,
        SystemTable::Vocabulary,
        SystemTable::Term,
        SystemTable::Plugins,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            SystemTable::Taxonomy => "taxonomy",
            SystemTable::Vocabulary => "vocabulary",
            SystemTable::Term => "term",
            SystemTable::Plugins => "plugins",
        }
    }
}

impl fmt::Display for SystemTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemTable {
    type Err = DatasourceOpalError;

    fn from_str(s: &str) -> Result<SystemTable> {
        let table = match s {
            "taxonomy" => SystemTable::Taxonomy,
            "vocabulary" => SystemTable::Vocabulary,
            "term" => SystemTable::Term,
            "plugins" => SystemTable::Plugins,
            other => return Err(DatasourceOpalError::UnknownSystemTable(other.to_owned())),
        };
        Ok(table)
    }
}

/// Locale-keyed text fields present on taxonomies, vocabularies and terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocaleField {
    Title,
    Description,
    Keywords,
}

impl LocaleField {
    const ALL: [LocaleField; 3] = [
        LocaleField::Title,
        LocaleField::Description,
        LocaleField::Keywords,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            LocaleField::Title => "title",
            LocaleField::Description => "description",
            LocaleField::Keywords => "keywords",
        }
    }
}

/// Column selector for a system table, resolved once per request so the row
/// loop never re-parses column names.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SystemColumn {
    Name,
    Author,
    License,
    TaxonomyName,
    VocabularyName,
    PackageType,
    Title,
    Description,
    Version,
    OpalVersion,
    Translated { field: LocaleField, locale: String },
    /// Unknown or unsupported column, always null.
    Unmapped,
}

fn resolve_column(table: SystemTable, name: &str) -> SystemColumn {
    match (table, name) {
        (_, "name") => return SystemColumn::Name,
        (SystemTable::Taxonomy, "author") => return SystemColumn::Author,
        (SystemTable::Taxonomy, "license") => return SystemColumn::License,
        (SystemTable::Vocabulary | SystemTable::Term, "taxonomy") => {
            return SystemColumn::TaxonomyName
        }
        (SystemTable::Term, "vocabulary") => return SystemColumn::VocabularyName,
        (SystemTable::Plugins, "type") => return SystemColumn::PackageType,
        (SystemTable::Plugins, "title") => return SystemColumn::Title,
        (SystemTable::Plugins, "description") => return SystemColumn::Description,
        (SystemTable::Plugins, "version") => return SystemColumn::Version,
        (SystemTable::Plugins, "opal_version") => return SystemColumn::OpalVersion,
        _ => {}
    }

    // Locale-keyed columns: the suffix after the first ':' is the locale.
    if table != SystemTable::Plugins {
        if let Some((field, locale)) = name.split_once(':') {
            for candidate in LocaleField::ALL {
                if candidate.as_str() == field {
                    return SystemColumn::Translated {
                        field: candidate,
                        locale: locale.to_string(),
                    };
                }
            }
        }
    }

    SystemColumn::Unmapped
}

/// First text whose locale matches, else null.
fn find_text(texts: &[LocaleText], locale: &str) -> CellValue {
    texts
        .iter()
        .find(|t| t.locale.as_deref() == Some(locale))
        .and_then(|t| t.text.clone())
        .map(CellValue::Scalar)
        .unwrap_or(CellValue::Null)
}

fn opt_scalar(value: &Option<String>) -> CellValue {
    match value {
        Some(v) => CellValue::Scalar(v.clone()),
        None => CellValue::Null,
    }
}

/// Accessor for the administration tables of an opal server.
///
/// Locale-keyed columns are generated for the locales supplied at
/// construction.
pub struct OpalAdministrationAccessor {
    fetch: Arc<dyn OpalFetch>,
    locales: Vec<String>,
}

impl OpalAdministrationAccessor {
    pub fn new(fetch: Arc<dyn OpalFetch>, locales: Vec<String>) -> OpalAdministrationAccessor {
        OpalAdministrationAccessor { fetch, locales }
    }

    pub fn list_schemas(&self) -> Vec<String> {
        vec![SYSTEM_SCHEMA.to_string()]
    }

    pub fn list_tables(&self, schema: &str) -> Vec<SchemaTableName> {
        if schema == SYSTEM_SCHEMA {
            SystemTable::ALL
                .iter()
                .map(|table| SchemaTableName::new(SYSTEM_SCHEMA, table.as_str()))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Static column layout of a system table.
    pub fn get_columns(&self, name: &SchemaTableName) -> Result<Vec<(String, OpalColumnType)>> {
        let table = self.system_table(name)?;
        let mut columns: Vec<(String, OpalColumnType)> = Vec::new();

        match table {
            SystemTable::Taxonomy => {
                columns.push(("name".to_string(), OpalColumnType::Text));
                columns.push(("author".to_string(), OpalColumnType::Text));
                columns.push(("license".to_string(), OpalColumnType::Text));
                self.push_locale_columns(&mut columns);
            }
            SystemTable::Vocabulary => {
                columns.push(("name".to_string(), OpalColumnType::Text));
                columns.push(("taxonomy".to_string(), OpalColumnType::Text));
                self.push_locale_columns(&mut columns);
            }
            SystemTable::Term => {
                columns.push(("name".to_string(), OpalColumnType::Text));
                columns.push(("taxonomy".to_string(), OpalColumnType::Text));
                columns.push(("vocabulary".to_string(), OpalColumnType::Text));
                self.push_locale_columns(&mut columns);
            }
            SystemTable::Plugins => {
                for name in ["name", "type", "title", "description", "version", "opal_version"] {
                    columns.push((name.to_string(), OpalColumnType::Text));
                }
            }
        }
        Ok(columns)
    }

    /// Rows of a system table for the requested columns, in request order.
    pub async fn get_rows(
        &self,
        name: &SchemaTableName,
        columns: &[String],
    ) -> Result<Vec<Vec<CellValue>>> {
        let table = self.system_table(name)?;
        let selectors: Vec<SystemColumn> = columns
            .iter()
            .map(|column| resolve_column(table, column))
            .collect();

        if table == SystemTable::Plugins {
            let packages = self.fetch.fetch_plugins().await?;
            return Ok(packages
                .packages
                .iter()
                .map(|package| plugin_row(package, &selectors))
                .collect());
        }

        let taxonomies = self.fetch.fetch_taxonomies().await?;
        let rows = match table {
            SystemTable::Taxonomy => taxonomy_rows(&taxonomies, &selectors),
            SystemTable::Vocabulary => vocabulary_rows(&taxonomies, &selectors),
            SystemTable::Term => term_rows(&taxonomies, &selectors),
            SystemTable::Plugins => unreachable!("handled above"),
        };
        Ok(rows)
    }

    fn system_table(&self, name: &SchemaTableName) -> Result<SystemTable> {
        if name.schema != SYSTEM_SCHEMA {
            return Err(DatasourceOpalError::UnknownSystemTable(name.to_string()));
        }
        name.table.parse()
    }

    fn push_locale_columns(&self, columns: &mut Vec<(String, OpalColumnType)>) {
        for field in LocaleField::ALL {
            for locale in &self.locales {
                columns.push((format!("{}:{locale}", field.as_str()), OpalColumnType::Text));
            }
        }
    }
}

fn taxonomy_rows(taxonomies: &[Taxonomy], selectors: &[SystemColumn]) -> Vec<Vec<CellValue>> {
    taxonomies
        .iter()
        .map(|taxonomy| {
            selectors
                .iter()
                .map(|selector| match selector {
                    SystemColumn::Name => CellValue::Scalar(taxonomy.name.clone()),
                    SystemColumn::Author => opt_scalar(&taxonomy.author),
                    SystemColumn::License => opt_scalar(&taxonomy.license),
                    SystemColumn::Translated { field, locale } => {
                        find_text(taxonomy_texts(taxonomy, *field), locale)
                    }
                    _ => CellValue::Null,
                })
                .collect()
        })
        .collect()
}

fn vocabulary_rows(taxonomies: &[Taxonomy], selectors: &[SystemColumn]) -> Vec<Vec<CellValue>> {
    let mut rows = Vec::new();
    for taxonomy in taxonomies {
        for vocabulary in &taxonomy.vocabularies {
            rows.push(
                selectors
                    .iter()
                    .map(|selector| match selector {
                        SystemColumn::Name => CellValue::Scalar(vocabulary.name.clone()),
                        SystemColumn::TaxonomyName => CellValue::Scalar(taxonomy.name.clone()),
                        SystemColumn::Translated { field, locale } => {
                            find_text(vocabulary_texts(vocabulary, *field), locale)
                        }
                        _ => CellValue::Null,
                    })
                    .collect(),
            );
        }
    }
    rows
}

fn term_rows(taxonomies: &[Taxonomy], selectors: &[SystemColumn]) -> Vec<Vec<CellValue>> {
    let mut rows = Vec::new();
    for taxonomy in taxonomies {
        for vocabulary in &taxonomy.vocabularies {
            for term in &vocabulary.terms {
                rows.push(
                    selectors
                        .iter()
                        .map(|selector| match selector {
                            SystemColumn::Name => CellValue::Scalar(term.name.clone()),
                            SystemColumn::TaxonomyName => CellValue::Scalar(taxonomy.name.clone()),
                            SystemColumn::VocabularyName => {
                                CellValue::Scalar(vocabulary.name.clone())
                            }
                            SystemColumn::Translated { field, locale } => {
                                find_text(term_texts(term, *field), locale)
                            }
                            _ => CellValue::Null,
                        })
                        .collect(),
                );
            }
        }
    }
    rows
}

fn plugin_row(package: &PluginPackage, selectors: &[SystemColumn]) -> Vec<CellValue> {
    selectors
        .iter()
        .map(|selector| match selector {
            SystemColumn::Name => CellValue::Scalar(package.name.clone()),
            SystemColumn::PackageType => opt_scalar(&package.package_type),
            SystemColumn::Title => opt_scalar(&package.title),
            SystemColumn::Description => opt_scalar(&package.description),
            SystemColumn::Version => opt_scalar(&package.version),
            SystemColumn::OpalVersion => opt_scalar(&package.opal_version),
            _ => CellValue::Null,
        })
        .collect()
}

fn taxonomy_texts(taxonomy: &Taxonomy, field: LocaleField) -> &[LocaleText] {
    match field {
        LocaleField::Title => &taxonomy.title,
        LocaleField::Description => &taxonomy.description,
        LocaleField::Keywords => &taxonomy.keywords,
    }
}

fn vocabulary_texts(vocabulary: &Vocabulary, field: LocaleField) -> &[LocaleText] {
    match field {
        LocaleField::Title => &vocabulary.title,
        LocaleField::Description => &vocabulary.description,
        LocaleField::Keywords => &vocabulary.keywords,
    }
}

fn term_texts(term: &Term, field: LocaleField) -> &[LocaleText] {
    match field {
        LocaleField::Title => &term.title,
        LocaleField::Description => &term.description,
        LocaleField::Keywords => &term.keywords,
    }
}
