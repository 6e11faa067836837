//! Tipos de dados trocados com a API REST de exportação HTML.
//!
//! As structs derivam `Serialize`/`Deserialize` conforme o formato JSON dos
//! endpoints `export` e `async-tasks`.

use serde::{Deserialize, Serialize};

/// Corpo enviado ao iniciar uma exportação com configurações embutidas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineExportRequest {
    /// Página raiz do espaço a exportar.
    pub root_page_id: String,
    /// Documento completo de configurações de exportação.
    pub export_settings: serde_json::Value,
}

/// Resposta do endpoint que inicia a exportação.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStarted {
    /// Identificador opaco do job atribuído pelo serviço.
    pub id: String,
}

/// Resposta do endpoint de status de um job assíncrono.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportStatus {
    /// Progresso informado pelo serviço; apenas para exibição.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Nome do artefato. Ausente (ou vazio) enquanto o job ainda roda.
    #[serde(default)]
    pub filename: Option<String>,
}

impl ExportStatus {
    /// Nome do artefato, tratando string vazia como ausente.
    pub fn artifact(&self) -> Option<&str> {
        self.filename.as_deref().filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_without_filename_is_running() {
        let status: ExportStatus = serde_json::from_str(r#"{"progress": 40}"#).unwrap();
        assert_eq!(status.progress, Some(40.0));
        assert_eq!(status.artifact(), None);
    }

    #[test]
    fn status_with_null_or_empty_filename_is_running() {
        let status: ExportStatus =
            serde_json::from_str(r#"{"progress": 99, "filename": null}"#).unwrap();
        assert_eq!(status.artifact(), None);

        let status: ExportStatus =
            serde_json::from_str(r#"{"progress": 99, "filename": ""}"#).unwrap();
        assert_eq!(status.artifact(), None);
    }

    #[test]
    fn status_with_filename_is_complete() {
        let status: ExportStatus =
            serde_json::from_str(r#"{"progress": 100, "filename": "space export.zip"}"#).unwrap();
        assert_eq!(status.artifact(), Some("space export.zip"));
    }

    #[test]
    fn inline_request_uses_camel_case() {
        let req = InlineExportRequest {
            root_page_id: "44696055".into(),
            export_settings: serde_json::json!({"theme": "default"}),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""rootPageId":"44696055""#));
        assert!(json.contains(r#""exportSettings""#));
    }
}
