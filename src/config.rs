// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the project definition file that orapack uses to
//! simplify the process of serialization and deserialization. File I/O is
//! left to the caller to figure out.
//!
//! # Project Definition
//!
//! Every orapack project carries a definition file at its top level named
//! "orapack.toml". The definition pins down three things: where each kind
//! of database object lives in the source tree (the pattern table), how
//! deploy scripts are assembled (the package table), and the version number
//! stamped into generated scripts.
//!
//! The pattern table maps one logical object type to one path pattern, as
//! understood by [`CompiledPattern`](crate::pattern::CompiledPattern).
//! Patterns are compiled once when a [`PathResolver`] is built from the
//! definition, and malformed patterns fail that build outright. Every key
//! has a sensible default, so a partial definition file is a valid one.

use crate::object::{ObjectType, PathResolver, ResolveError};

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Project definition layout.
///
/// Resolved once per operation and passed into the pattern, resolver, and
/// packaging layers explicitly. Nothing in the core mutates it after load.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProjectDefinition {
    /// Source-tree layout of database objects.
    #[serde(default)]
    pub source: SourceSettings,

    /// Deploy-script packaging settings.
    #[serde(default)]
    pub package: PackageSettings,

    /// Test file selection.
    #[serde(default)]
    pub test: TestSettings,

    /// Version stamped into generated deploy scripts.
    #[serde(default)]
    pub version: VersionSettings,
}

impl ProjectDefinition {
    /// Build a path resolver from the configured pattern table.
    ///
    /// Patterns are handed over in declaration order, which is the fixed
    /// logical-type order of [`ObjectType`].
    ///
    /// # Errors
    ///
    /// - Return [`ResolveError`] if any configured pattern is malformed.
    pub fn resolver(&self) -> Result<PathResolver, ResolveError> {
        PathResolver::new(
            self.source
                .pattern
                .iter()
                .map(|(kind, pattern)| (*kind, pattern.clone())),
            self.package.output.clone(),
        )
    }
}

impl FromStr for ProjectDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut definition: ProjectDefinition =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on the deploy output pattern.
        definition.package.output = shellexpand::full(definition.package.output.as_str())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned();

        Ok(definition)
    }
}

impl Display for ProjectDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Source-tree layout settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceSettings {
    /// One path pattern per logical object type.
    pub pattern: BTreeMap<ObjectType, String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        let pattern = [
            (ObjectType::PackageSpec, "./src/{schema-name}/PACKAGES/{object-name}.sql"),
            (ObjectType::PackageBody, "./src/{schema-name}/PACKAGE_BODIES/{object-name}.sql"),
            (ObjectType::Trigger, "./src/{schema-name}/TRIGGERS/{object-name}.sql"),
            (ObjectType::View, "./src/{schema-name}/VIEWS/{object-name}.sql"),
            (ObjectType::Function, "./src/{schema-name}/FUNCTIONS/{object-name}.sql"),
            (ObjectType::Procedure, "./src/{schema-name}/PROCEDURES/{object-name}.sql"),
            (ObjectType::Table, "./src/{schema-name}/TABLES/{object-name}.sql"),
            (ObjectType::TypeSpec, "./src/{schema-name}/TYPES/{object-name}.sql"),
            (ObjectType::TypeBody, "./src/{schema-name}/TYPE_BODIES/{object-name}.sql"),
            (ObjectType::Synonym, "./src/{schema-name}/SYNONYMS/{object-name}.sql"),
            (ObjectType::Apex, "./src/{schema-name}/APEX/{object-name}.sql"),
        ]
        .into_iter()
        .map(|(kind, pattern)| (kind, pattern.to_string()))
        .collect();

        Self { pattern }
    }
}

/// Deploy-script packaging settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageSettings {
    /// Path pattern for generated deploy scripts, one per schema.
    pub output: String,

    /// Glob patterns selecting packaging input files.
    pub input: Vec<String>,

    /// Glob patterns excluding files from packaging.
    pub exclude: Vec<String>,

    /// Encoding label carried into generated artifacts.
    pub encoding: String,

    /// Whether to run the templating pass over input file content.
    pub templating: bool,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            output: "./deploy/{schema-name}/run.sql".into(),
            input: vec!["./src/**/*.sql".into()],
            exclude: Vec::new(),
            encoding: "utf8".into(),
            templating: false,
        }
    }
}

/// Test file selection settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TestSettings {
    /// Glob patterns selecting unit-test scripts.
    pub input: Vec<String>,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            input: vec!["./test/**/*.test.sql".into()],
        }
    }
}

/// Version settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VersionSettings {
    /// Version number stamped into deploy-script headers.
    pub number: String,
}

impl Default for VersionSettings {
    fn default() -> Self {
        Self {
            number: "0.0.1".into(),
        }
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("DEPLOY_HOME", "/srv/deploy")])]
    fn deserialize_project_definition() -> anyhow::Result<()> {
        let result: ProjectDefinition = r#"
            [source.pattern]
            package-spec = "./db/{schema-name}/pck/{object-name}.pks"
            package-body = "./db/{schema-name}/pck/{object-name}.pkb"

            [package]
            output = "$DEPLOY_HOME/{schema-name}/run.sql"
            input = ["./db/**/*.pks", "./db/**/*.pkb"]
            exclude = ["./db/**/scratch/*"]
            encoding = "utf8"
            templating = true

            [version]
            number = "1.4.0"
        "#
        .parse()?;

        let expect = ProjectDefinition {
            source: SourceSettings {
                pattern: [
                    (
                        ObjectType::PackageSpec,
                        "./db/{schema-name}/pck/{object-name}.pks".to_string(),
                    ),
                    (
                        ObjectType::PackageBody,
                        "./db/{schema-name}/pck/{object-name}.pkb".to_string(),
                    ),
                ]
                .into_iter()
                .collect(),
            },
            package: PackageSettings {
                output: "/srv/deploy/{schema-name}/run.sql".into(),
                input: vec!["./db/**/*.pks".into(), "./db/**/*.pkb".into()],
                exclude: vec!["./db/**/scratch/*".into()],
                encoding: "utf8".into(),
                templating: true,
            },
            test: TestSettings::default(),
            version: VersionSettings {
                number: "1.4.0".into(),
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn empty_definition_falls_back_to_defaults() {
        let result: ProjectDefinition = "".parse().unwrap();
        assert_eq!(result, ProjectDefinition::default());
        assert_eq!(result.package.output, "./deploy/{schema-name}/run.sql");
        assert_eq!(result.source.pattern.len(), 11);
    }

    #[test]
    fn definition_round_trips_through_display() {
        let definition = ProjectDefinition::default();
        let rendered = definition.to_string();
        let reparsed: ProjectDefinition = rendered.parse().unwrap();
        assert_eq!(reparsed, definition);
    }

    #[test]
    fn default_definition_builds_a_resolver() {
        let definition = ProjectDefinition::default();
        let resolver = definition.resolver().unwrap();

        let identity = resolver.classify("./src/HR/TABLES/employees.sql").unwrap();
        assert_eq!(identity.object_type, ObjectType::Table);
        assert_eq!(identity.owner.as_deref(), Some("HR"));
    }

    #[test]
    fn malformed_pattern_fails_resolver_build() {
        let definition: ProjectDefinition = r#"
            [source.pattern]
            view = "./src/{schema-name}{object-name}.sql"
        "#
        .parse()
        .unwrap();

        assert!(definition.resolver().is_err());
    }
}
