//! Tipos de erro para o cliente do serviço de exportação.
//!
//! Define [`ServiceError`] com variantes para erros HTTP da API, respostas
//! malformadas e falhas de rede. Usa `thiserror` para derivar `Display` e
//! `Error` a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o serviço remoto de exportação.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// O serviço respondeu com status não-2xx (ex.: 401 credenciais inválidas).
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// A resposta de início de exportação não trouxe um identificador de job.
    #[error("export service returned an empty job id")]
    MissingJobId,

    /// Falha de rede subjacente (DNS, conexão recusada, TLS, corpo inválido).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Falha ao gravar o artefato baixado no destino local.
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}
