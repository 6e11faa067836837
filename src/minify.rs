//! Script and stylesheet minification.
//!
//! Uses oxc for JavaScript and lightningcss for CSS. Identifier renaming is
//! disabled and output lines are wrapped at statement or rule boundaries.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::{GetSpan, SourceType};

use crate::error::MinifyError;

// Plain browser scripts, not ES modules.
fn script_source_type() -> SourceType {
    SourceType::mjs().with_script(true)
}

/// Minify JavaScript source code.
pub fn minify_js(source: &str, wrap_width: usize) -> Result<String, MinifyError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, script_source_type()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(MinifyError::Syntax(err.to_string()));
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: None,
        compress: Some(CompressOptions::safest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;

    let code = non_empty(code)?;
    if wrap_width == 0 {
        return Ok(code);
    }

    // Re-parse the minified output to find top-level statement boundaries.
    let allocator = Allocator::default();
    let reparsed = Parser::new(&allocator, &code, script_source_type()).parse();
    if !reparsed.errors.is_empty() {
        return Ok(code);
    }
    let ends: Vec<usize> = reparsed
        .program
        .body
        .iter()
        .map(|stmt| stmt.span().end as usize)
        .collect();
    Ok(wrap_at(&code, ends, wrap_width))
}

/// Minify CSS source code.
pub fn minify_css(source: &str, wrap_width: usize) -> Result<String, MinifyError> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|e| MinifyError::Syntax(e.to_string()))?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| MinifyError::Printer(e.to_string()))?;

    let code = non_empty(result.code)?;
    if wrap_width == 0 {
        return Ok(code);
    }
    let ends = css_rule_ends(&code);
    Ok(wrap_at(&code, ends, wrap_width))
}

fn non_empty(code: String) -> Result<String, MinifyError> {
    if code.trim().is_empty() {
        Err(MinifyError::Empty)
    } else {
        Ok(code)
    }
}

/// Byte offsets just past every `}` that is not inside a string or a `url(...)`.
fn css_rule_ends(css: &str) -> Vec<usize> {
    let bytes = css.as_bytes();
    let mut ends = Vec::new();
    let mut quote: Option<u8> = None;
    let mut in_url = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        if let Some(q) = quote {
            if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'"' | b'\'' => quote = Some(b),
            // Unquoted url tokens may contain `}`.
            b'(' if i >= 3 && bytes[i - 3..i].eq_ignore_ascii_case(b"url") => in_url = true,
            b')' if in_url => in_url = false,
            b'}' if !in_url => ends.push(i + 1),
            _ => {}
        }
    }
    ends
}

/// Insert a newline at the first boundary after a line reaches `width` bytes.
///
/// `boundaries` are ascending byte offsets where a line break is harmless.
fn wrap_at(code: &str, boundaries: impl IntoIterator<Item = usize>, width: usize) -> String {
    let mut out = String::with_capacity(code.len() + code.len() / width.max(1) + 1);
    let mut last = 0;
    let mut line_start = 0;
    for end in boundaries {
        if end <= last || end >= code.len() {
            continue;
        }
        out.push_str(&code[last..end]);
        last = end;
        if out.len() - line_start >= width {
            out.push('\n');
            line_start = out.len();
        }
    }
    out.push_str(&code[last..]);
    out
}
