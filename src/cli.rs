//! Interface de linha de comando do docpress baseada em clap.
//!
//! Define a struct [`Cli`] com os subcomandos [`Command`] (run, process)
//! e flags globais (--config, --max-poll-attempts, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;

/// docpress: exporta um espaço do wiki e publica a documentação minificada.
#[derive(Debug, Parser)]
#[command(name = "docpress", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração.
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Número máximo de consultas de status antes de desistir da exportação.
    #[arg(long, global = true)]
    pub max_poll_attempts: Option<u32>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exporta o espaço, baixa o artefato e processa todos os arquivos.
    Run,

    /// Processa a árvore de staging existente sem iniciar uma exportação.
    Process,
}
