//! Per-file transform into the output tree: minify scripts and stylesheets,
//! copy everything else, and fall back to a verbatim copy whenever
//! minification is not possible.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use crate::error::{MinifyError, TransformError};
use crate::minify::{minify_css, minify_js};
use crate::pipeline::TransformOutcome;

/// Kind of staged asset, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Script,
    Style,
    Other,
}

impl AssetKind {
    /// Classify by exact, case-sensitive extension: `.js` and `.css` only.
    pub fn classify(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("js") => AssetKind::Script,
            Some("css") => AssetKind::Style,
            _ => AssetKind::Other,
        }
    }
}

/// A file discovered in the staging tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub source: PathBuf,
    pub relative: PathBuf,
    pub kind: AssetKind,
}

impl StagedFile {
    /// Returns `None` if `source` is not under `staging_root`.
    pub fn new(staging_root: &Path, source: PathBuf) -> Option<Self> {
        let relative = source.strip_prefix(staging_root).ok()?.to_path_buf();
        let kind = AssetKind::classify(&relative);
        Some(Self {
            source,
            relative,
            kind,
        })
    }
}

/// Writes staged files into a mirrored output tree.
#[derive(Debug, Clone)]
pub struct Transformer {
    output_root: PathBuf,
    wrap_width: usize,
}

impl Transformer {
    pub fn new(output_root: impl Into<PathBuf>, wrap_width: usize) -> Self {
        Self {
            output_root: output_root.into(),
            wrap_width,
        }
    }

    /// Output path mirroring the file's position in the staging tree.
    pub fn destination(&self, file: &StagedFile) -> PathBuf {
        self.output_root.join(&file.relative)
    }

    /// Write one file into the output tree.
    ///
    /// A minifier failure never leaves the destination unwritten: the original
    /// bytes are copied instead and the reason is carried in the outcome. Only
    /// I/O failures are returned as errors.
    pub async fn process(&self, file: &StagedFile) -> Result<TransformOutcome, TransformError> {
        let dest = self.destination(file);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| TransformError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let minified = match file.kind {
            AssetKind::Other => {
                copy_verbatim(&file.source, &dest).await?;
                return Ok(TransformOutcome::verbatim());
            }
            AssetKind::Script | AssetKind::Style => self.minify(file).await?,
        };

        match minified {
            Ok(code) => {
                tokio::fs::write(&dest, code)
                    .await
                    .map_err(|source| TransformError::Write {
                        path: dest.clone(),
                        source,
                    })?;
                debug!(path = %file.relative.display(), "minified");
                Ok(TransformOutcome::Minified)
            }
            Err(reason) => {
                warn!(path = %file.relative.display(), %reason, "minification failed, copying original");
                copy_verbatim(&file.source, &dest).await?;
                Ok(TransformOutcome::fallback(reason))
            }
        }
    }

    async fn minify(
        &self,
        file: &StagedFile,
    ) -> Result<Result<String, MinifyError>, TransformError> {
        let bytes = tokio::fs::read(&file.source)
            .await
            .map_err(|source| TransformError::Read {
                path: file.source.clone(),
                source,
            })?;
        let Ok(text) = String::from_utf8(bytes) else {
            return Ok(Err(MinifyError::Encoding));
        };

        let kind = file.kind;
        let width = self.wrap_width;
        let result = spawn_blocking(move || match kind {
            AssetKind::Script => minify_js(&text, width),
            _ => minify_css(&text, width),
        })
        .await;

        // A panicking minifier is one more reason to fall back.
        Ok(result.unwrap_or_else(|e| Err(MinifyError::Printer(format!("minifier panicked: {e}")))))
    }
}

async fn copy_verbatim(from: &Path, to: &Path) -> Result<(), TransformError> {
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|source| TransformError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn staged(root: &Path, rel: &str, contents: &[u8]) -> StagedFile {
        let source = root.join(rel);
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, contents).unwrap();
        StagedFile::new(root, source).unwrap()
    }

    fn setup() -> (TempDir, PathBuf, Transformer) {
        let tmp = TempDir::new().unwrap();
        let staging = tmp.path().join("src");
        let transformer = Transformer::new(tmp.path().join("docs"), 80);
        (tmp, staging, transformer)
    }

    #[test]
    fn classification_is_exact_and_case_sensitive() {
        assert_eq!(AssetKind::classify(Path::new("a/b/app.js")), AssetKind::Script);
        assert_eq!(AssetKind::classify(Path::new("a/b/site.css")), AssetKind::Style);
        assert_eq!(AssetKind::classify(Path::new("a/b/c.CSS")), AssetKind::Other);
        assert_eq!(AssetKind::classify(Path::new("a/b/c.JS")), AssetKind::Other);
        assert_eq!(AssetKind::classify(Path::new("a/b/c.json")), AssetKind::Other);
        assert_eq!(AssetKind::classify(Path::new("a/b/c.min.js")), AssetKind::Script);
        assert_eq!(AssetKind::classify(Path::new("a/b/js")), AssetKind::Other);
        assert_eq!(AssetKind::classify(Path::new("a/b/.css")), AssetKind::Other);
    }

    #[test]
    fn staged_file_outside_root_is_rejected() {
        assert!(StagedFile::new(Path::new("/srv/src"), PathBuf::from("/tmp/x.js")).is_none());
    }

    #[tokio::test]
    async fn other_files_are_copied_verbatim() {
        let (_tmp, staging, transformer) = setup();
        let bytes = [0x89, b'P', b'N', b'G', 0, 0xff];
        let file = staged(&staging, "img/logo.png", &bytes);

        let outcome = transformer.process(&file).await.unwrap();
        assert_eq!(outcome, TransformOutcome::verbatim());
        assert_eq!(fs::read(transformer.destination(&file)).unwrap(), bytes);
    }

    #[tokio::test]
    async fn valid_script_is_minified() {
        let (_tmp, staging, transformer) = setup();
        let source = "var greeting = 'hello';\n\n// log it\nconsole.log(greeting + ' world');\n";
        let file = staged(&staging, "js/index.js", source.as_bytes());

        let outcome = transformer.process(&file).await.unwrap();
        assert_eq!(outcome, TransformOutcome::Minified);
        let written = fs::read_to_string(transformer.destination(&file)).unwrap();
        assert!(!written.is_empty());
        assert!(written.len() < source.len());
    }

    #[tokio::test]
    async fn malformed_style_falls_back_to_original_bytes() {
        let (_tmp, staging, transformer) = setup();
        let source = b".a { color: red; }\n%%% { color: blue; }\n";
        let file = staged(&staging, "style.css", source);

        let outcome = transformer.process(&file).await.unwrap();
        assert!(outcome.is_fallback());
        assert_eq!(fs::read(transformer.destination(&file)).unwrap(), source);
    }

    #[tokio::test]
    async fn malformed_script_falls_back_to_original_bytes() {
        let (_tmp, staging, transformer) = setup();
        let source = b"function broken( {\n  return 1;\n";
        let file = staged(&staging, "app.js", source);

        let outcome = transformer.process(&file).await.unwrap();
        assert!(matches!(
            outcome,
            TransformOutcome::Copied {
                fallback: Some(MinifyError::Syntax(_))
            }
        ));
        assert_eq!(fs::read(transformer.destination(&file)).unwrap(), source);
    }

    #[tokio::test]
    async fn non_utf8_script_falls_back() {
        let (_tmp, staging, transformer) = setup();
        let source = [b'v', b'a', b'r', b' ', 0xff, 0xfe, b';'];
        let file = staged(&staging, "latin.js", &source);

        let outcome = transformer.process(&file).await.unwrap();
        assert_eq!(outcome, TransformOutcome::fallback(MinifyError::Encoding));
        assert_eq!(fs::read(transformer.destination(&file)).unwrap(), source);
    }

    #[tokio::test]
    async fn empty_minified_output_falls_back() {
        let (_tmp, staging, transformer) = setup();
        let source = b"/* placeholder */\n";
        let file = staged(&staging, "empty.css", source);

        let outcome = transformer.process(&file).await.unwrap();
        assert_eq!(outcome, TransformOutcome::fallback(MinifyError::Empty));
        assert_eq!(fs::read(transformer.destination(&file)).unwrap(), source);
    }

    #[tokio::test]
    async fn uppercase_extension_is_copied_not_minified() {
        let (_tmp, staging, transformer) = setup();
        let source = b".nav {\n  color: red;\n}\n";
        let file = staged(&staging, "a/b/c.CSS", source);
        assert_eq!(file.kind, AssetKind::Other);

        let outcome = transformer.process(&file).await.unwrap();
        assert_eq!(outcome, TransformOutcome::verbatim());
        assert_eq!(fs::read(transformer.destination(&file)).unwrap(), source);
    }

    #[tokio::test]
    async fn existing_output_directories_are_reused() {
        let (tmp, staging, transformer) = setup();
        fs::create_dir_all(tmp.path().join("docs/img")).unwrap();
        fs::write(tmp.path().join("docs/img/unrelated.txt"), "keep").unwrap();
        let file = staged(&staging, "img/a.txt", b"a");

        transformer.process(&file).await.unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("docs/img/unrelated.txt")).unwrap(), "keep");
    }

    #[tokio::test]
    async fn missing_source_is_an_io_error() {
        let (_tmp, staging, transformer) = setup();
        let file = StagedFile {
            source: staging.join("gone.png"),
            relative: PathBuf::from("gone.png"),
            kind: AssetKind::Other,
        };

        let err = transformer.process(&file).await.unwrap_err();
        assert!(matches!(err, TransformError::Copy { .. }));
    }
}
