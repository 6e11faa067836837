//! Configuração do docpress carregada a partir de `docpress.toml`.
//!
//! A struct [`ExportConfig`] reúne todos os parâmetros do pipeline e é passada
//! explicitamente ao orquestrador. Valores ausentes no arquivo usam defaults.
//! As variáveis `PERS_WIKI_HOME`, `PERS_WIKI_USER` e `PERS_WIKI_PASSWORD` têm
//! precedência sobre o arquivo.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Arquivo de configuração procurado no diretório atual.
pub const DEFAULT_CONFIG_FILE: &str = "docpress.toml";

/// Par de credenciais para autenticação básica no serviço.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// A senha nunca aparece em logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Como a exportação é configurada no serviço remoto.
///
/// No TOML: `[export_scheme] scheme_id = "..."` ou
/// `[export_scheme.settings] ...` com o documento completo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScheme {
    /// Referência a um esquema de exportação salvo no serviço.
    SchemeId(String),
    /// Documento de configurações enviado junto com o pedido.
    Settings(serde_json::Value),
}

impl Default for ExportScheme {
    fn default() -> Self {
        ExportScheme::SchemeId(default_scheme_id())
    }
}

/// Onde o conteúdo de redirecionamento é sobreposto ao final do pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayTarget {
    /// Diretório de staging (comportamento histórico).
    #[default]
    Staging,
    /// Diretório de saída publicado.
    Output,
}

/// Configuração de nível superior carregada de `docpress.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// URL base do wiki (ex.: `https://wiki.example.com`).
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub credentials: Credentials,

    /// Página raiz do espaço exportado.
    #[serde(default = "default_root_page_id")]
    pub root_page_id: String,

    #[serde(default)]
    pub export_scheme: ExportScheme,

    /// Diretório que recebe o arquivo extraído; recriado a cada execução.
    #[serde(default = "default_staging_root")]
    pub staging_root: PathBuf,

    /// Diretório com o resultado minificado ou copiado.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Diretório de redirecionamentos sobreposto ao final.
    #[serde(default = "default_redirect_root")]
    pub redirect_root: PathBuf,

    #[serde(default)]
    pub overlay_target: OverlayTarget,

    /// Intervalo entre consultas de status, em milissegundos.
    #[serde(default = "default_interval_ms")]
    pub poll_interval_ms: u64,

    /// Espera após a extração antes de percorrer os arquivos, em milissegundos.
    #[serde(default = "default_interval_ms")]
    pub settle_delay_ms: u64,

    /// Tempo máximo de uma requisição ao serviço, em milissegundos. No download
    /// vale como limite entre leituras, não para o arquivo inteiro.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Limite opcional de consultas de status. `None` espera indefinidamente.
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,

    /// Largura de quebra de linha da saída minificada; 0 desativa.
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,

    /// Aceita certificados TLS inválidos (instâncias internas autoassinadas).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

// Página raiz padrão do espaço de documentação.
fn default_root_page_id() -> String {
    "44696055".to_string()
}

// Esquema de exportação salvo no serviço.
fn default_scheme_id() -> String {
    "-020B004813A10F3831A9D8C9A7869275".to_string()
}

fn default_staging_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("docs")
}

fn default_redirect_root() -> PathBuf {
    PathBuf::from("redirects")
}

// Intervalo de polling e de espera: 1000ms.
fn default_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    120_000
}

fn default_wrap_width() -> usize {
    80
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            credentials: Credentials::default(),
            root_page_id: default_root_page_id(),
            export_scheme: ExportScheme::default(),
            staging_root: default_staging_root(),
            output_root: default_output_root(),
            redirect_root: default_redirect_root(),
            overlay_target: OverlayTarget::default(),
            poll_interval_ms: default_interval_ms(),
            settle_delay_ms: default_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_poll_attempts: None,
            wrap_width: default_wrap_width(),
            accept_invalid_certs: false,
        }
    }
}

impl ExportConfig {
    /// Carrega a configuração do caminho informado.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<ExportConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Aplica as variáveis de ambiente sobre os valores do arquivo.
    ///
    /// Recebe a função de consulta para permitir testes sem alterar o ambiente real.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(home) = non_empty("PERS_WIKI_HOME") {
            self.base_url = home;
        }
        if let Some(user) = non_empty("PERS_WIKI_USER") {
            self.credentials.username = user;
        }
        if let Some(password) = non_empty("PERS_WIKI_PASSWORD") {
            self.credentials.password = password;
        }
    }

    /// Verifica os campos obrigatórios para falar com o serviço remoto.
    pub fn validate_remote(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url is not set (config file or PERS_WIKI_HOME)");
        }
        if self.root_page_id.trim().is_empty() {
            bail!("root_page_id must not be empty");
        }
        if let ExportScheme::SchemeId(id) = &self.export_scheme
            && id.trim().is_empty()
        {
            bail!("export_scheme.scheme_id must not be empty");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
