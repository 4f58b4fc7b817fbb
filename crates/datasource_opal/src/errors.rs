#[derive(Debug, thiserror::Error)]
pub enum DatasourceOpalError {
    #[error(transparent)]
    OpalConnectorError(#[from] opal_connector::errors::OpalError),

    #[error("Unknown opal table: {0}")]
    UnknownTable(String),

    #[error("Unknown opal system table: {0}")]
    UnknownSystemTable(String),
}

pub type Result<T, E = DatasourceOpalError> = std::result::Result<T, E>;
