//! Command template validation and binding.
//!
//! Turns a raw, untrusted command string plus concrete job paths into a
//! [`BoundCommand`] argument vector. The vector is handed to the
//! executor directly -- no shell ever interprets the assembled command,
//! so metacharacters in filenames cannot change its meaning.
//!
//! Validation policy: the first whitespace-delimited word must contain
//! the configured program name (case-insensitive), and the placeholders
//! `{input}` and `{output}` must each occur exactly once. Tokenization
//! follows POSIX shell-word rules: single quotes are literal, double
//! quotes honour `\"` and `\\`, and a backslash escapes the next
//! character outside quotes.

use std::path::Path;

use crate::error::{CoreError, CoreResult};

pub const INPUT_PLACEHOLDER: &str = "{input}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// A raw template that passed structural validation.
#[derive(Debug, Clone)]
pub struct ValidatedTemplate {
    raw: String,
    program: String,
}

/// An ordered process argument vector with placeholders resolved.
///
/// Kept as a discrete `program` + `args` pair (never a single string)
/// so the injection-safety invariant is visible in the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl BoundCommand {
    /// One-line rendering for logs. Not shell-safe; never executed.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Structurally validate a raw command template.
///
/// `program` is the required executable token (normally `ffmpeg`); the
/// check is a loose, case-insensitive containment test over the first
/// word, so `ffmpeg.exe` or `/usr/bin/ffmpeg` also pass.
pub fn validate(raw: &str, program: &str) -> CoreResult<ValidatedTemplate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Template("empty command".into()));
    }

    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if !first_word.contains(&program.to_lowercase()) {
        return Err(CoreError::Template(format!(
            "command must start with {program}, got '{first_word}'"
        )));
    }

    require_exactly_once(trimmed, INPUT_PLACEHOLDER)?;
    require_exactly_once(trimmed, OUTPUT_PLACEHOLDER)?;

    Ok(ValidatedTemplate {
        raw: trimmed.to_string(),
        program: program.to_string(),
    })
}

fn require_exactly_once(s: &str, placeholder: &str) -> CoreResult<()> {
    match s.matches(placeholder).count() {
        1 => Ok(()),
        0 => Err(CoreError::Template(format!("missing {placeholder}"))),
        n => Err(CoreError::Template(format!(
            "{placeholder} must appear exactly once, found {n}"
        ))),
    }
}

impl ValidatedTemplate {
    /// Substitute the placeholders with concrete job-confined paths and
    /// split into an argument vector.
    ///
    /// Only tokens that are exactly `{input}` or `{output}` are
    /// replaced; a placeholder embedded in a larger token stays
    /// literal. The leading token is always replaced by the configured
    /// program, so a template saying `ffmpeg-from-somewhere` still
    /// invokes the executable the server was configured with.
    pub fn bind(&self, input_path: &Path, output_path: &Path) -> CoreResult<BoundCommand> {
        let mut tokens = tokenize(&self.raw)?;
        if tokens.is_empty() {
            return Err(CoreError::Template("empty command".into()));
        }

        let input = input_path.to_string_lossy().into_owned();
        let output = output_path.to_string_lossy().into_owned();
        let args = tokens
            .drain(1..)
            .map(|t| match t.as_str() {
                INPUT_PLACEHOLDER => input.clone(),
                OUTPUT_PLACEHOLDER => output.clone(),
                _ => t,
            })
            .collect();

        Ok(BoundCommand {
            program: self.program.clone(),
            args,
        })
    }
}

/// Split a command line into words with POSIX shell quoting rules.
///
/// Equivalent to Python's `shlex.split(s, posix=True)` for the subset
/// this service accepts; unterminated quotes and dangling backslashes
/// are template errors.
pub fn tokenize(s: &str) -> CoreResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut have_token = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if have_token {
                    tokens.push(std::mem::take(&mut current));
                    have_token = false;
                }
            }
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| CoreError::Template("dangling backslash".into()))?;
                current.push(escaped);
                have_token = true;
            }
            '\'' => {
                have_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => {
                            return Err(CoreError::Template("unterminated single quote".into()))
                        }
                    }
                }
            }
            '"' => {
                have_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            // Inside double quotes a backslash only
                            // escapes the quote and itself.
                            Some(next @ ('"' | '\\')) => current.push(next),
                            Some(next) => {
                                current.push('\\');
                                current.push(next);
                            }
                            None => {
                                return Err(CoreError::Template("unterminated double quote".into()))
                            }
                        },
                        Some(inner) => current.push(inner),
                        None => {
                            return Err(CoreError::Template("unterminated double quote".into()))
                        }
                    }
                }
            }
            other => {
                current.push(other);
                have_token = true;
            }
        }
    }

    if have_token {
        tokens.push(current);
    }
    Ok(tokens)
}
