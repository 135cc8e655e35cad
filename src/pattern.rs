// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path-pattern compilation and inversion.
//!
//! Orapack describes where database objects live in a source tree through
//! __path patterns__. A path pattern is a plain relative path that may carry
//! up to one `{schema-name}` placeholder and up to one `{object-name}`
//! placeholder, e.g.:
//!
//! ```text
//! ./src/{schema-name}/PACKAGE_BODIES/{object-name}.sql
//! ```
//!
//! Patterns are used in both directions. Forward, a pattern plus a schema
//! and object name produces a concrete file path. Backward, a concrete file
//! path is matched against the pattern and the schema and object names are
//! extracted back out of it.
//!
//! # Compilation
//!
//! Each pattern string is compiled once, at configuration load, into an
//! ordered token list where every token is either a literal run of path
//! text or one of the two placeholders. Extraction is then a single linear
//! scan: literals are matched case-insensitively, and each placeholder
//! captures the span up to the next literal (or to the end of the path).
//!
//! A pattern is rejected at compile time when a placeholder appears more
//! than once, or when the two placeholders are adjacent with no literal
//! text between them. Adjacent placeholders would leave no anchor to decide
//! where one captured value ends and the other begins.
//!
//! # Known Limitation
//!
//! Extraction is a textual inverse of interpolation, not a general parser.
//! If a captured value itself contains the literal text that follows its
//! placeholder in the pattern, the capture stops at the first occurrence of
//! that literal and the extracted value comes out short.

use glob::{MatchOptions, Pattern};

/// Placeholder token for the owning schema.
pub const SCHEMA_VAR: &str = "{schema-name}";

/// Placeholder token for the object name.
pub const OBJECT_VAR: &str = "{object-name}";

/// Match options used for every path comparison orapack performs.
///
/// Paths coming out of version control and off of case-insensitive file
/// systems do not agree on casing, so all matching is case-insensitive.
/// Separators stay literal so `*` never swallows a directory level.
pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One token of a compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal run of path text.
    Literal(String),

    /// The `{schema-name}` placeholder.
    SchemaName,

    /// The `{object-name}` placeholder.
    ObjectName,
}

/// Schema and object names pulled back out of a concrete path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub schema_name: Option<String>,
    pub object_name: Option<String>,
}

/// A path pattern compiled into its token list.
///
/// Immutable once compiled. Configuration load compiles every pattern up
/// front so malformed patterns fail the whole run instead of producing
/// silently wrong classifications later.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    raw: String,
    tokens: Vec<Token>,
    glob: Pattern,
}

impl CompiledPattern {
    /// Compile a pattern string into its token list.
    ///
    /// A pattern without any placeholder compiles to a bare literal path.
    /// Legacy single-schema layouts rely on that for their deploy output.
    ///
    /// # Errors
    ///
    /// - Return [`PatternError::DuplicatePlaceholder`] if either placeholder
    ///   appears more than once.
    /// - Return [`PatternError::AdjacentPlaceholders`] if the placeholders
    ///   touch with no literal separator.
    /// - Return [`PatternError::Glob`] if the glob rendering of the pattern
    ///   is not a valid glob.
    pub fn compile(pattern: impl Into<String>) -> Result<Self> {
        let raw = pattern.into();
        let tokens = tokenize(&raw)?;

        let schemas = tokens.iter().filter(|t| **t == Token::SchemaName).count();
        let objects = tokens.iter().filter(|t| **t == Token::ObjectName).count();
        if schemas > 1 {
            return Err(PatternError::DuplicatePlaceholder {
                pattern: raw,
                placeholder: SCHEMA_VAR,
            });
        }
        if objects > 1 {
            return Err(PatternError::DuplicatePlaceholder {
                pattern: raw,
                placeholder: OBJECT_VAR,
            });
        }
        if tokens
            .windows(2)
            .any(|pair| !matches!(pair[0], Token::Literal(_)) && !matches!(pair[1], Token::Literal(_)))
        {
            return Err(PatternError::AdjacentPlaceholders { pattern: raw });
        }

        let glob = Pattern::new(&render_glob(&tokens)).map_err(|source| PatternError::Glob {
            pattern: raw.clone(),
            source,
        })?;

        Ok(Self { raw, tokens, glob })
    }

    /// Original pattern string as written in configuration.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern carries a `{schema-name}` placeholder.
    pub fn has_schema(&self) -> bool {
        self.tokens.contains(&Token::SchemaName)
    }

    /// Whether the pattern carries an `{object-name}` placeholder.
    pub fn has_object(&self) -> bool {
        self.tokens.contains(&Token::ObjectName)
    }

    /// Glob rendering of the pattern, placeholders replaced with `*`.
    pub fn to_glob(&self) -> String {
        render_glob(&self.tokens)
    }

    /// Match a concrete path against the glob rendering of the pattern.
    ///
    /// Matching is case-insensitive with literal separators. The path must
    /// already be normalized to `./`-rooted POSIX form.
    pub fn matches(&self, path: &str) -> bool {
        self.glob.matches_with(path, MATCH_OPTIONS)
    }

    /// Interpolate schema and object names into the pattern.
    ///
    /// Substitution is literal. Names are not escaped or quoted in any way.
    pub fn substitute(&self, schema_name: &str, object_name: &str) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for token in &self.tokens {
            match token {
                Token::Literal(lit) => out.push_str(lit),
                Token::SchemaName => out.push_str(schema_name),
                Token::ObjectName => out.push_str(object_name),
            }
        }
        out
    }

    /// Extract placeholder values back out of a concrete path.
    ///
    /// Literals anchor the scan case-insensitively; each placeholder
    /// captures up to the next literal. Returns `None` when the path does
    /// not fit the pattern shape. Captured values keep the casing they have
    /// in the path.
    pub fn extract(&self, path: &str) -> Option<Extracted> {
        let mut found = Extracted::default();
        let mut pos = 0;
        let mut tokens = self.tokens.iter().peekable();

        while let Some(token) = tokens.next() {
            match token {
                Token::Literal(lit) => {
                    if !starts_with_ignore_case(&path[pos..], lit) {
                        return None;
                    }
                    pos += lit.len();
                }
                variable => {
                    let end = match tokens.peek() {
                        Some(Token::Literal(lit)) => {
                            pos + find_ignore_case(&path[pos..], lit)?
                        }
                        // Validation guarantees placeholders never touch.
                        Some(_) => unreachable!("adjacent placeholders rejected at compile"),
                        None => path.len(),
                    };

                    let value = path[pos..end].to_string();
                    match variable {
                        Token::SchemaName => found.schema_name = Some(value),
                        Token::ObjectName => found.object_name = Some(value),
                        Token::Literal(_) => unreachable!(),
                    }
                    pos = end;
                }
            }
        }

        // Trailing path text beyond the final literal means no fit.
        if pos == path.len() {
            Some(found)
        } else {
            None
        }
    }
}

fn tokenize(pattern: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(SCHEMA_VAR) {
            flush_literal(&mut tokens, &mut literal);
            tokens.push(Token::SchemaName);
            rest = after;
        } else if let Some(after) = rest.strip_prefix(OBJECT_VAR) {
            flush_literal(&mut tokens, &mut literal);
            tokens.push(Token::ObjectName);
            rest = after;
        } else {
            let mut chars = rest.chars();
            // Unwrap is fine, loop guard guarantees a next char.
            literal.push(chars.next().unwrap());
            rest = chars.as_str();
        }
    }
    flush_literal(&mut tokens, &mut literal);

    Ok(tokens)
}

fn flush_literal(tokens: &mut Vec<Token>, literal: &mut String) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

fn render_glob(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(lit) => out.push_str(lit),
            Token::SchemaName | Token::ObjectName => out.push('*'),
        }
    }
    out
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack.len() >= prefix.len()
        && haystack.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if haystack.len() < needle.len() {
        return None;
    }

    (0..=haystack.len() - needle.len()).find(|&start| {
        haystack.as_bytes()[start..start + needle.len()].eq_ignore_ascii_case(needle.as_bytes())
    })
}

/// Path-pattern error types.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// Placeholder used more than once in one pattern.
    #[error("placeholder {placeholder:?} appears more than once in pattern {pattern:?}")]
    DuplicatePlaceholder {
        pattern: String,
        placeholder: &'static str,
    },

    /// Placeholders touch with no literal separator between them.
    #[error("placeholders in pattern {pattern:?} have no literal separator between them")]
    AdjacentPlaceholders { pattern: String },

    /// Glob rendering of the pattern is not a valid glob.
    #[error("pattern {pattern:?} does not render to a valid glob")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PatternError> = std::result::Result<T, E>;
