//! Interface de terminal do docpress: spinner e saída colorida.
//!
//! Usa `indicatif` para o spinner enquanto a exportação remota roda e
//! `console` para as cores. O [`TerminalProgress`] imprime uma linha por
//! arquivo processado, distinguindo minificação, cópia de fallback e falha.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{ExportJob, FileResult, RunReport, RunStatus, Stage, TransformOutcome};

/// Recebe os eventos de progresso do pipeline. Não afeta o fluxo de controle.
pub trait ProgressSink {
    /// O pipeline entrou em um novo estágio.
    fn stage(&self, _stage: Stage) {}

    /// Uma consulta de status do job remoto foi respondida.
    fn export_progress(&self, _job: &ExportJob) {}

    /// Um arquivo foi gravado (ou falhou) na árvore de saída.
    fn file_processed(&self, _path: &Path, _result: &FileResult) {}
}

/// Descarta todos os eventos; usado nos testes.
#[cfg(test)]
pub struct Silent;

#[cfg(test)]
impl ProgressSink for Silent {}

/// Indicador visual de progresso de uma execução no terminal.
pub struct TerminalProgress {
    // Spinner exibido enquanto o job remoto roda.
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl TerminalProgress {
    /// Cria o spinner ainda parado; nada é desenhado até [`begin`](Self::begin).
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Inicia o spinner com a descrição da execução.
    pub fn begin(&self, description: &str) {
        self.pb.set_message(description.to_string());
        self.pb.enable_steady_tick(Duration::from_millis(100));
    }

    /// Destino dos logs do `tracing` que não corrompe o spinner.
    pub fn log_writer(&self) -> LogWriter {
        LogWriter(self.pb.clone())
    }

    /// Finaliza o spinner e exibe o resumo da execução.
    pub fn finish(&self, report: &RunReport) {
        self.pb.finish_and_clear();
        let style = if report.status != RunStatus::Completed || report.failures() > 0 {
            &self.red
        } else {
            &self.green
        };
        println!(
            "{} {} files: {} minified, {} fallback copies, {} failed ({} ms)",
            style.apply_to("■"),
            report.files.len(),
            report.minified(),
            report.fallbacks(),
            report.failures(),
            report.duration_ms,
        );
        if report.overlaid > 0 {
            println!("  {} {} redirect files overlaid", self.dim.apply_to("+"), report.overlaid);
        }
    }

    /// Encerra o spinner após um erro fatal.
    pub fn abort(&self, error: &dyn std::fmt::Display) {
        self.pb.finish_and_clear();
        eprintln!("  {} {error}", self.red.apply_to("✗"));
    }
}

/// Escreve no stderr com o spinner suspenso durante a escrita.
#[derive(Clone)]
pub struct LogWriter(ProgressBar);

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl ProgressSink for TerminalProgress {
    fn stage(&self, stage: Stage) {
        self.pb.set_message(format!("{stage}"));
    }

    fn export_progress(&self, job: &ExportJob) {
        let progress = job
            .progress
            .map(|p| format!("{p:.0}%"))
            .unwrap_or_else(|| "?".to_string());
        self.pb
            .set_message(format!("EXPORTING: job {} at {progress}", job.id));
    }

    fn file_processed(&self, path: &Path, result: &FileResult) {
        let line = match result {
            FileResult::Written(TransformOutcome::Minified) => {
                format!("  {} {}", self.green.apply_to("✓"), path.display())
            }
            FileResult::Written(TransformOutcome::Copied { fallback: None }) => {
                format!("  {} {}", self.dim.apply_to("·"), path.display())
            }
            FileResult::Written(TransformOutcome::Copied {
                fallback: Some(reason),
            }) => format!(
                "  {} {} {}",
                self.yellow.apply_to("↻"),
                self.yellow.apply_to(path.display()),
                self.dim.apply_to(format!("({reason})"))
            ),
            FileResult::Failed(err) => format!(
                "  {} {} {}",
                self.red.apply_to("✗"),
                self.red.apply_to(path.display()),
                self.dim.apply_to(format!("({err})"))
            ),
        };
        self.pb.println(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_writer_passes_lines_through() {
        let mut writer = LogWriter(ProgressBar::hidden());
        assert_eq!(writer.write(b"INFO run finished\n").unwrap(), 18);
        writer.flush().unwrap();
    }

    #[test]
    fn log_writer_works_while_spinner_runs() {
        let progress = TerminalProgress::new();
        progress.pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        progress.begin("Starting export");

        let mut writer = progress.log_writer();
        writer.write_all(b"WARN minification failed\n").unwrap();
        assert!(!progress.pb.is_finished());
        progress.abort(&"stopped");
        assert!(progress.pb.is_finished());
    }
}
