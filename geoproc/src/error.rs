//! Erros das operações de geoprocessamento

use thiserror::Error;

/// Erro de uma operação
#[derive(Debug, Error)]
pub enum GeoProcError {
    /// Nome de operação desconhecido
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Parâmetro obrigatório ausente
    #[error("Operation '{operation}' is missing required parameter '{parameter}'")]
    MissingParameter {
        operation: &'static str,
        parameter: &'static str,
    },

    /// Parâmetro com tipo inválido
    #[error("Operation '{operation}': parameter '{parameter}' has the wrong type (expected {expected})")]
    InvalidParameter {
        operation: &'static str,
        parameter: &'static str,
        expected: &'static str,
    },

    /// Camadas com CRS incompatíveis
    #[error("CRS mismatch: EPSG:{left} vs EPSG:{right}")]
    CrsMismatch { left: u32, right: u32 },

    /// Expressão não suportada pelo avaliador
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// Geometria inválida para a operação
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}
