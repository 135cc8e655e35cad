// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Database object identity and path resolution.
//!
//! Every file in an orapack project maps to a database object, and every
//! database object maps back to a file. The [`PathResolver`] owns that
//! bidirectional mapping. Forward, it classifies a file path into an
//! [`ObjectIdentity`] describing the owning schema, the Oracle object type,
//! and the object name. Backward, it interpolates an identity into the
//! configured path pattern for its type.
//!
//! # Classification
//!
//! Classification walks three stages, first match wins:
//!
//! 1. The path is tested against every configured source-object pattern.
//!    A hit extracts the schema and object name straight out of the path.
//! 2. The path is tested against the deploy-output pattern. A hit extracts
//!    the schema the same way, and takes the object name from the file's
//!    base name.
//! 3. Anything else is an opaque script. The owner is guessed from the
//!    second path segment when the path is deep enough to carry one, e.g.
//!    `./scripts/HR/initial_dml.sql` is attributed to `HR`.
//!
//! Classification never fails on a path. An unrecognized path degrades to
//! an opaque script so batch operations keep going. Malformed pattern
//! configuration, on the other hand, fails resolver construction outright,
//! because classifying against broken patterns would produce silently wrong
//! identities for the whole run.
//!
//! # Overlapping Patterns
//!
//! Nothing stops a configuration from declaring source patterns whose glob
//! forms overlap. Which pattern such a path belongs to is ambiguous. The
//! [`MatchPolicy`] decides: [`MatchPolicy::FirstWins`] keeps the historical
//! behavior of taking the first pattern in declaration order, while
//! [`MatchPolicy::Strict`] refuses the classification so tests and careful
//! setups can surface the overlap.

use crate::pattern::{CompiledPattern, PatternError};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::debug;

/// Logical object types orapack knows how to place in a source tree.
///
/// Each variant corresponds to one configurable path pattern. The variant
/// order is the declaration order used when several patterns match one path
/// under [`MatchPolicy::FirstWins`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectType {
    PackageSpec,
    PackageBody,
    Trigger,
    View,
    Function,
    Procedure,
    Table,
    TypeSpec,
    TypeBody,
    Synonym,
    Apex,

    /// Generated deploy script matched by the package output pattern.
    DeployScript,

    /// Opaque script outside every configured pattern.
    Script,
}

impl ObjectType {
    /// All types that map to source files through a configured pattern.
    pub const SOURCE_TYPES: [ObjectType; 11] = [
        ObjectType::PackageSpec,
        ObjectType::PackageBody,
        ObjectType::Trigger,
        ObjectType::View,
        ObjectType::Function,
        ObjectType::Procedure,
        ObjectType::Table,
        ObjectType::TypeSpec,
        ObjectType::TypeBody,
        ObjectType::Synonym,
        ObjectType::Apex,
    ];

    /// Oracle type token as the dictionary views spell it.
    pub fn ora_type(&self) -> &'static str {
        match self {
            ObjectType::PackageSpec => "PACKAGE",
            ObjectType::PackageBody => "PACKAGE BODY",
            ObjectType::Trigger => "TRIGGER",
            ObjectType::View => "VIEW",
            ObjectType::Function => "FUNCTION",
            ObjectType::Procedure => "PROCEDURE",
            ObjectType::Table => "TABLE",
            ObjectType::TypeSpec => "TYPE",
            ObjectType::TypeBody => "TYPE BODY",
            ObjectType::Synonym => "SYNONYM",
            ObjectType::Apex => "APEX",
            ObjectType::DeployScript => "deployScript",
            ObjectType::Script => "script",
        }
    }

    /// Alternate type token for APIs that refuse embedded spaces.
    ///
    /// Oracle addresses the same object differently across its own APIs,
    /// e.g. `PACKAGE BODY` in the dictionary but `PACKAGE_BODY` for
    /// `DBMS_METADATA`. Differs from [`ObjectType::ora_type`] only for the
    /// spec/body pairs.
    pub fn ora_type_alt(&self) -> &'static str {
        match self {
            ObjectType::PackageSpec => "PACKAGE_SPEC",
            ObjectType::PackageBody => "PACKAGE_BODY",
            ObjectType::TypeSpec => "TYPE_SPEC",
            ObjectType::TypeBody => "TYPE_BODY",
            other => other.ora_type(),
        }
    }

    /// Resolve either Oracle type token back to a logical type.
    ///
    /// Accepts both spellings case-insensitively. `PACKAGE` resolves to the
    /// spec, never the body.
    pub fn from_ora_type(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref().trim().to_uppercase();
        let all = [
            ObjectType::SOURCE_TYPES.as_slice(),
            &[ObjectType::DeployScript, ObjectType::Script],
        ]
        .concat();

        all.into_iter().find(|kind| {
            kind.ora_type().eq_ignore_ascii_case(&token)
                || kind.ora_type_alt().eq_ignore_ascii_case(&token)
        })
    }

    /// Whether this type maps to a source file through a pattern.
    pub fn is_source_type(&self) -> bool {
        ObjectType::SOURCE_TYPES.contains(self)
    }
}

impl Display for ObjectType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.ora_type())
    }
}

/// Identity of one database object, as derived from a path or a type/name
/// triple.
///
/// `owner` is `None` for legacy single-schema layouts whose paths encode no
/// schema. Callers may overwrite the owner after classification when a
/// connection configuration attributes the object to a different default
/// user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity {
    pub owner: Option<String>,
    pub object_type: ObjectType,
    pub object_name: String,
    pub is_source: bool,
    pub is_script: bool,
}

impl ObjectIdentity {
    /// Oracle type token of this identity.
    pub fn ora_type(&self) -> &'static str {
        self.object_type.ora_type()
    }

    /// Alternate Oracle type token of this identity.
    pub fn ora_type_alt(&self) -> &'static str {
        self.object_type.ora_type_alt()
    }
}

impl Display for ObjectIdentity {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match &self.owner {
            Some(owner) => write!(fmt, "{owner}: {} {}", self.ora_type(), self.object_name),
            None => write!(fmt, "{} {}", self.ora_type(), self.object_name),
        }
    }
}

/// Policy for paths matching more than one source pattern.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Take the first matching pattern in declaration order.
    #[default]
    FirstWins,

    /// Refuse classification of a path matched by several patterns.
    Strict,
}

/// Bidirectional mapping between object identities and file paths.
///
/// Holds one compiled pattern per source type plus the deploy-output
/// pattern. Read-only after construction, so one resolver can be shared
/// freely across a whole packaging run.
#[derive(Debug, Clone)]
pub struct PathResolver {
    sources: Vec<(ObjectType, CompiledPattern)>,
    output: CompiledPattern,
    policy: MatchPolicy,
    root: Option<String>,
}

impl PathResolver {
    /// Construct a resolver from raw pattern strings.
    ///
    /// `sources` pairs each logical type with its pattern, in declaration
    /// order. `output` is the deploy-output pattern.
    ///
    /// # Errors
    ///
    /// - Return [`ResolveError::Pattern`] if any pattern fails to compile.
    /// - Return [`ResolveError::MissingObjectPlaceholder`] if a source
    ///   pattern lacks the `{object-name}` placeholder, since the object
    ///   name could never be recovered from such a path.
    pub fn new(
        sources: impl IntoIterator<Item = (ObjectType, impl Into<String>)>,
        output: impl Into<String>,
    ) -> Result<Self> {
        let mut compiled = Vec::new();
        for (kind, pattern) in sources {
            let pattern = CompiledPattern::compile(pattern)?;
            if !pattern.has_object() {
                return Err(ResolveError::MissingObjectPlaceholder {
                    object_type: kind,
                    pattern: pattern.raw().to_string(),
                });
            }
            compiled.push((kind, pattern));
        }

        Ok(Self {
            sources: compiled,
            output: CompiledPattern::compile(output)?,
            policy: MatchPolicy::default(),
            root: None,
        })
    }

    /// Select the policy for overlapping source patterns.
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Strip this project-root prefix during path normalization.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into().replace('\\', "/"));
        self
    }

    /// Normalize a path to `./`-rooted POSIX form.
    ///
    /// Windows separators become `/`, a configured project-root prefix is
    /// stripped, and the result always starts with `./`.
    pub fn normalize(&self, path: &str) -> String {
        let mut path = path.replace('\\', "/");

        if let Some(root) = &self.root {
            let root = root.trim_end_matches('/');
            if path.len() > root.len()
                && path.as_bytes()[..root.len()].eq_ignore_ascii_case(root.as_bytes())
                && path.as_bytes()[root.len()] == b'/'
            {
                path = path[root.len() + 1..].to_string();
            }
        }

        while let Some(stripped) = path.strip_prefix("./") {
            path = stripped.to_string();
        }
        let path = path.trim_start_matches('/');

        format!("./{path}")
    }

    /// Classify a file path into an object identity.
    ///
    /// Source patterns are tried first, then the deploy-output pattern,
    /// then the opaque-script fallback. Never fails under
    /// [`MatchPolicy::FirstWins`].
    ///
    /// # Errors
    ///
    /// - Return [`ResolveError::AmbiguousMatch`] under
    ///   [`MatchPolicy::Strict`] if several source patterns match the path.
    pub fn classify(&self, path: &str) -> Result<ObjectIdentity> {
        let path = self.normalize(path);

        let hits: Vec<&(ObjectType, CompiledPattern)> = self
            .sources
            .iter()
            .filter(|(_, pattern)| pattern.matches(&path))
            .collect();

        if hits.len() > 1 {
            match self.policy {
                MatchPolicy::Strict => {
                    return Err(ResolveError::AmbiguousMatch {
                        path,
                        patterns: hits.iter().map(|(_, p)| p.raw().to_string()).collect(),
                    })
                }
                MatchPolicy::FirstWins => {
                    debug!(
                        "path {path:?} matches {} source patterns, taking {:?}",
                        hits.len(),
                        hits[0].1.raw()
                    );
                }
            }
        }

        if let Some((kind, pattern)) = hits.first() {
            // The glob already matched, so extraction fits by construction.
            let extracted = pattern.extract(&path).unwrap_or_default();
            return Ok(ObjectIdentity {
                owner: extracted.schema_name,
                object_type: *kind,
                object_name: extracted.object_name.unwrap_or_default(),
                is_source: true,
                is_script: false,
            });
        }

        if self.output.matches(&path) {
            let extracted = self.output.extract(&path).unwrap_or_default();
            return Ok(ObjectIdentity {
                owner: extracted.schema_name,
                object_type: ObjectType::DeployScript,
                object_name: base_name(&path).to_string(),
                is_source: false,
                is_script: true,
            });
        }

        Ok(ObjectIdentity {
            owner: script_owner(&path),
            object_type: ObjectType::Script,
            object_name: base_name(&path).to_string(),
            is_source: false,
            is_script: true,
        })
    }

    /// Resolve a type/name triple back to its canonical source path.
    ///
    /// Inverse of [`PathResolver::classify`] for source objects. `ora_type`
    /// accepts either Oracle spelling of the type token.
    ///
    /// # Errors
    ///
    /// - Return [`ResolveError::UnknownOraType`] if the token names no
    ///   known type.
    /// - Return [`ResolveError::NoPatternForType`] if the configuration
    ///   declares no pattern for the type.
    pub fn resolve_path(
        &self,
        owner: impl AsRef<str>,
        ora_type: impl AsRef<str>,
        object_name: impl AsRef<str>,
    ) -> Result<String> {
        let kind = ObjectType::from_ora_type(ora_type.as_ref()).ok_or_else(|| {
            ResolveError::UnknownOraType {
                token: ora_type.as_ref().to_string(),
            }
        })?;

        let pattern = self
            .sources
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, pattern)| pattern)
            .ok_or(ResolveError::NoPatternForType { object_type: kind })?;

        Ok(pattern.substitute(owner.as_ref(), object_name.as_ref()))
    }

    /// Resolve the deploy-output path an identity packages into.
    ///
    /// An owner-less identity leaves the `{schema-name}` placeholder empty,
    /// so the empty path segment it would produce is collapsed.
    pub fn resolve_output_path(&self, identity: &ObjectIdentity) -> String {
        let mut path = self.output.substitute(
            identity.owner.as_deref().unwrap_or_default(),
            &identity.object_name,
        );
        while path.contains("//") {
            path = path.replace("//", "/");
        }
        path
    }
}

/// File base name without its extension.
fn base_name(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Owner heuristic for opaque scripts.
///
/// Layouts like `./scripts/{owner}/{name}.sql` put the owner in the second
/// segment. Shallower paths carry no owner at all.
fn script_owner(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() > 3 {
        Some(segments[2].to_string())
    } else {
        None
    }
}

/// Object path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Pattern compilation fails.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Source pattern cannot recover an object name.
    #[error("source pattern {pattern:?} for {object_type} lacks the {{object-name}} placeholder")]
    MissingObjectPlaceholder {
        object_type: ObjectType,
        pattern: String,
    },

    /// Several source patterns match one path under strict policy.
    #[error("path {path:?} matches several source patterns: {patterns:?}")]
    AmbiguousMatch { path: String, patterns: Vec<String> },

    /// Oracle type token names no known object type.
    #[error("unknown Oracle object type token {token:?}")]
    UnknownOraType { token: String },

    /// No pattern configured for an object type.
    #[error("no source pattern configured for {object_type}")]
    NoPatternForType { object_type: ObjectType },
}

/// Friendly result alias :3
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;
