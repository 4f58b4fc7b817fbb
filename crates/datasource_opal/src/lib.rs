//! Opal external data source implementation.
//!
//! Exposes the datasources of an [OBiBa Opal](https://www.obiba.org/pages/products/opal/)
//! server as relational schemas and tables. [`OpalAccessor`] serves the
//! regular data tables (one schema per remote datasource);
//! [`administration::OpalAdministrationAccessor`] serves the fixed `system`
//! schema built from the server configuration (taxonomies and plugins).

pub mod errors;

pub mod administration;
pub mod catalog;
pub mod datatype;
pub mod values;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opal_connector::models::{OpalDatasource, OpalVariable, PluginPackages, Taxonomy, ValueSets};
use opal_connector::Connection;
use tracing::trace;

use crate::catalog::{OpalCatalog, SchemaTableName};
use crate::datatype::{column_type, OpalColumnType};
use crate::errors::Result;
use crate::values::{extract_values, CellValue};

/// Identifier pseudo column present on every opal data table.
pub const IDENTIFIER_COLUMN: &str = "identifier";

/// The fetch interface the datasource needs from the transport.
///
/// Implemented by [`opal_connector::Connection`]; tests substitute mocks.
/// Fetch failures are fatal for the triggering call; retries, if any, belong
/// to the transport.
#[async_trait]
pub trait OpalFetch: Send + Sync {
    async fn fetch_datasources(&self) -> Result<Vec<OpalDatasource>>;

    async fn fetch_variables(&self, datasource: &str, table: &str) -> Result<Vec<OpalVariable>>;

    async fn fetch_value_sets(&self, datasource: &str, table: &str) -> Result<ValueSets>;

    async fn fetch_taxonomies(&self) -> Result<Vec<Taxonomy>>;

    async fn fetch_plugins(&self) -> Result<PluginPackages>;
}

#[async_trait]
impl OpalFetch for Connection {
    async fn fetch_datasources(&self) -> Result<Vec<OpalDatasource>> {
        Ok(self.list_datasources().await?)
    }

    async fn fetch_variables(&self, datasource: &str, table: &str) -> Result<Vec<OpalVariable>> {
        Ok(self.table_variables(datasource, table).await?)
    }

    async fn fetch_value_sets(&self, datasource: &str, table: &str) -> Result<ValueSets> {
        Ok(self.table_value_sets(datasource, table).await?)
    }

    async fn fetch_taxonomies(&self) -> Result<Vec<Taxonomy>> {
        Ok(self.taxonomies().await?)
    }

    async fn fetch_plugins(&self) -> Result<PluginPackages> {
        Ok(self.plugins().await?)
    }
}

/// Accessor for the data tables of an opal server.
pub struct OpalAccessor {
    fetch: Arc<dyn OpalFetch>,
    catalog: OpalCatalog,
}

impl OpalAccessor {
    pub fn new(fetch: Arc<dyn OpalFetch>) -> OpalAccessor {
        let catalog = OpalCatalog::new(fetch.clone());
        OpalAccessor { fetch, catalog }
    }

    /// Like [`OpalAccessor::new`], damping rediscovery of an empty remote
    /// catalog to at most once per `cache_delay`.
    pub fn with_cache_delay(fetch: Arc<dyn OpalFetch>, cache_delay: Duration) -> OpalAccessor {
        let catalog = OpalCatalog::with_cache_delay(fetch.clone(), cache_delay);
        OpalAccessor { fetch, catalog }
    }

    pub fn catalog(&self) -> &OpalCatalog {
        &self.catalog
    }

    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        self.catalog.list_schemas().await
    }

    pub async fn list_tables(&self, schema: &str) -> Result<Vec<SchemaTableName>> {
        self.catalog.list_tables(schema).await
    }

    /// Column metadata for a table: the identifier pseudo column first, then
    /// the remote variables in declared order.
    pub async fn get_columns(
        &self,
        name: &SchemaTableName,
    ) -> Result<Vec<(String, OpalColumnType)>> {
        self.catalog.initialize().await?;
        let (datasource, table) = self.catalog.resolve(name)?;
        let mut variables = self.fetch.fetch_variables(&datasource, &table).await?;
        variables.sort_by_key(|v| v.index);

        let mut columns = Vec::with_capacity(variables.len() + 1);
        columns.push((IDENTIFIER_COLUMN.to_string(), OpalColumnType::Text));
        for variable in variables {
            columns.push((
                variable.name,
                column_type(&variable.value_type, variable.repeatable),
            ));
        }
        Ok(columns)
    }

    /// Materialize the rows of a table for the requested columns, one cell
    /// per column in request order.
    pub async fn get_rows(
        &self,
        name: &SchemaTableName,
        columns: &[String],
    ) -> Result<Vec<Vec<CellValue>>> {
        self.catalog.initialize().await?;
        let (datasource, table) = self.catalog.resolve(name)?;

        let variables = self.fetch.fetch_variables(&datasource, &table).await?;
        let value_sets = self.fetch.fetch_value_sets(&datasource, &table).await?;

        let positions = column_positions(&variables, columns);
        trace!(?positions, table = %name, "materializing opal rows");

        Ok(value_sets
            .value_sets
            .iter()
            .map(|vs| extract_values(vs, &positions))
            .collect())
    }
}

/// Position of each requested column within raw record cells, from the
/// variable's declared index. The identifier pseudo column, and any column
/// without a matching variable, maps to -1 which extraction resolves to the
/// record identifier.
fn column_positions(variables: &[OpalVariable], columns: &[String]) -> Vec<i32> {
    columns
        .iter()
        .map(|name| {
            variables
                .iter()
                .find(|v| v.name == *name)
                .map(|v| v.index)
                .unwrap_or(-1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct TableFetch {
        datasources: Vec<OpalDatasource>,
        variables: Vec<OpalVariable>,
        value_sets: ValueSets,
    }

    #[async_trait]
    impl OpalFetch for TableFetch {
        async fn fetch_datasources(&self) -> Result<Vec<OpalDatasource>> {
            Ok(self.datasources.clone())
        }

        async fn fetch_variables(&self, datasource: &str, table: &str) -> Result<Vec<OpalVariable>> {
            // The accessor must resolve back to the remote names.
            assert_eq!(datasource, "Study");
            assert_eq!(table, "Baseline");
            Ok(self.variables.clone())
        }

        async fn fetch_value_sets(&self, _: &str, _: &str) -> Result<ValueSets> {
            Ok(self.value_sets.clone())
        }

        async fn fetch_taxonomies(&self) -> Result<Vec<Taxonomy>> {
            unimplemented!()
        }

        async fn fetch_plugins(&self) -> Result<PluginPackages> {
            unimplemented!()
        }
    }

    fn table_fetch() -> Arc<TableFetch> {
        let datasources = vec![OpalDatasource {
            name: "Study".to_string(),
            table_names: vec!["Baseline".to_string()],
            ..Default::default()
        }];
        let variables = vec![
            OpalVariable {
                name: "name".to_string(),
                value_type: "text".to_string(),
                index: 0,
                ..Default::default()
            },
            OpalVariable {
                name: "age".to_string(),
                value_type: "integer".to_string(),
                index: 1,
                ..Default::default()
            },
            OpalVariable {
                name: "visits".to_string(),
                value_type: "date".to_string(),
                repeatable: true,
                index: 2,
                ..Default::default()
            },
        ];
        let value_sets: ValueSets = serde_json::from_value(json!({
            "entityType": "Participant",
            "variables": ["name", "age", "visits"],
            "valueSets": [
                {"identifier": "P1", "values": [
                    {"value": "alice"},
                    {"value": 42},
                    {"values": [{"value": "2017-01-01"}, {"value": "2017-06-01"}]}
                ]},
                {"identifier": "P2", "values": [{"value": "bob"}]}
            ]
        }))
        .unwrap();
        Arc::new(TableFetch {
            datasources,
            variables,
            value_sets,
        })
    }

    #[tokio::test]
    async fn get_columns_identifier_first() {
        let accessor = OpalAccessor::new(table_fetch());
        let columns = accessor
            .get_columns(&SchemaTableName::new("study", "baseline"))
            .await
            .unwrap();
        assert_eq!(
            columns,
            vec![
                ("identifier".to_string(), OpalColumnType::Text),
                ("name".to_string(), OpalColumnType::Text),
                ("age".to_string(), OpalColumnType::BigInt),
                // Repeatable, so text regardless of the date value type.
                ("visits".to_string(), OpalColumnType::Text),
            ]
        );
    }

    #[tokio::test]
    async fn get_rows_in_request_order() {
        let accessor = OpalAccessor::new(table_fetch());
        let rows = accessor
            .get_rows(
                &SchemaTableName::new("study", "baseline"),
                &[
                    "age".to_string(),
                    "identifier".to_string(),
                    "name".to_string(),
                ],
            )
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![
                    CellValue::Scalar("42".to_string()),
                    CellValue::Scalar("P1".to_string()),
                    CellValue::Scalar("alice".to_string()),
                ],
                // Short record: missing cells resolve to null.
                vec![
                    CellValue::Null,
                    CellValue::Scalar("P2".to_string()),
                    CellValue::Scalar("bob".to_string()),
                ],
            ]
        );
    }

    #[tokio::test]
    async fn get_rows_repeatable_column() {
        let accessor = OpalAccessor::new(table_fetch());
        let rows = accessor
            .get_rows(
                &SchemaTableName::new("study", "baseline"),
                &["visits".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(
            rows[0],
            vec![CellValue::List(vec![
                CellValue::Scalar("2017-01-01".to_string()),
                CellValue::Scalar("2017-06-01".to_string()),
            ])]
        );
        assert_eq!(rows[1], vec![CellValue::Null]);
    }

    #[tokio::test]
    async fn get_rows_unknown_table() {
        let accessor = OpalAccessor::new(table_fetch());
        let err = accessor
            .get_rows(&SchemaTableName::new("study", "nope"), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::errors::DatasourceOpalError::UnknownTable(_)
        ));
    }

    #[test]
    fn positions_for_unknown_columns_resolve_to_identifier() {
        let variables = vec![OpalVariable {
            name: "age".to_string(),
            index: 0,
            ..Default::default()
        }];
        let positions = column_positions(
            &variables,
            &[
                "identifier".to_string(),
                "age".to_string(),
                "unknown".to_string(),
            ],
        );
        assert_eq!(positions, vec![-1, 0, -1]);
    }
}
