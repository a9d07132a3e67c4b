use thiserror::Error;

/// Errores del backend. La capa que invoca estas operaciones (shell de
/// escritorio, API HTTP) decide cómo presentarlos al usuario.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("error de base de datos: {0}")]
    Database(rusqlite::Error),

    /// La operación fue rechazada antes de escribir nada.
    #[error("{0}")]
    Validacion(String),

    #[error("{0}")]
    NoEncontrado(String),

    #[error("error de serialización: {0}")]
    Serializacion(#[from] serde_json::Error),

    /// La base de datos estaba ocupada o el estado compartido quedó
    /// inconsistente. Reintentar es seguro.
    #[error("operación en conflicto, reintente: {0}")]
    Concurrencia(String),
}

impl AppError {
    pub fn validacion(mensaje: impl Into<String>) -> Self {
        AppError::Validacion(mensaje.into())
    }

    pub fn no_encontrado(mensaje: impl Into<String>) -> Self {
        AppError::NoEncontrado(mensaje.into())
    }

    pub fn es_reintentable(&self) -> bool {
        matches!(self, AppError::Concurrencia(_))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(causa, _)
                if causa.code == rusqlite::ErrorCode::DatabaseBusy
                    || causa.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                AppError::Concurrencia(err.to_string())
            }
            _ => AppError::Database(err),
        }
    }
}
