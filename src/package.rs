// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deploy-script packaging.
//!
//! Packaging turns many tracked source files into few deployable SQL
//! scripts, one per schema. The pipeline is a straight line:
//!
//! 1. Resolve the working file set from the configured input and exclude
//!    globs ([`crate::changeset`]).
//! 2. Optionally run each file's content through the templating pass
//!    ([`templating`]).
//! 3. Classify every file and group it under the deploy-output path its
//!    owning schema resolves to. Groups keep first-seen order, and files
//!    keep input enumeration order inside their group.
//! 4. Wrap each object's code with a banner block, concatenate per group,
//!    and wrap each group with the transactional script frame.
//!
//! # Script Frame
//!
//! The frame ordering is load-bearing. The `SPOOL` directive must come
//! before any object body so the whole deployment run lands in the log
//! file, and `COMMIT` must be the last statement so DML done by generator
//! or data scripts becomes visible only once the whole script ran. DDL
//! auto-commits on the target database either way; the trailing commit only
//! flushes DML.
//!
//! # Failure Semantics
//!
//! Packaging never aborts because one path is unclassifiable. Such files
//! degrade to opaque scripts and ride along in their group. Broken pattern
//! configuration, by contrast, fails packager construction before any file
//! is touched.
//!
//! Everything here produces in-memory strings only. Writing scripts to
//! disk, log renaming, and version-control calls all belong to the caller.

pub mod manifest;
pub mod templating;

use crate::{
    changeset::{self, ChangeSetError},
    config::ProjectDefinition,
    object::{ObjectIdentity, PathResolver, ResolveError},
    package::templating::{NoTemplating, Render, RenderError},
};

use chrono::Local;
use std::fs;
use tracing::{debug, instrument, warn};

/// Fixed-width banner line prefixed to every packaged object.
const BANNER: &str = "PROMPT ********************************************************************";

/// Input files grouped under the deploy script they package into.
///
/// Keys keep first-seen order, and so do the input paths inside one group.
/// Built fresh per packaging run, never shared across runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileGroups {
    groups: Vec<FileGroup>,
}

/// One deploy script and the input files that feed it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    pub output: String,
    pub inputs: Vec<String>,
}

impl FileGroups {
    /// Append an input path to the group of its output script.
    ///
    /// A new output path opens a new group at the end of the listing.
    pub fn insert(&mut self, output: impl AsRef<str>, input: impl Into<String>) {
        let output = output.as_ref();
        match self.groups.iter().position(|group| group.output == output) {
            Some(found) => self.groups[found].inputs.push(input.into()),
            None => self.groups.push(FileGroup {
                output: output.to_string(),
                inputs: vec![input.into()],
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Package tracked source files into per-schema deploy scripts.
///
/// Holds the resolved configuration snapshot for one packaging run. The
/// renderer seam decides what, if anything, happens to file content before
/// concatenation.
#[derive(Debug)]
pub struct Packager<R = NoTemplating>
where
    R: Render,
{
    definition: ProjectDefinition,
    resolver: PathResolver,
    renderer: R,
}

impl Packager<NoTemplating> {
    /// Construct a packager without a templating pass.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::Resolve`] if the configured patterns fail
    ///   to compile.
    pub fn new(definition: ProjectDefinition) -> Result<Self> {
        let resolver = definition.resolver()?;
        Ok(Self {
            definition,
            resolver,
            renderer: NoTemplating,
        })
    }
}

impl<R> Packager<R>
where
    R: Render,
{
    /// Swap in a different content renderer.
    pub fn with_renderer<T: Render>(self, renderer: T) -> Packager<T> {
        Packager {
            definition: self.definition,
            resolver: self.resolver,
            renderer,
        }
    }

    /// Resolver backing this packager.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Group input files under their deploy-output scripts.
    ///
    /// Input order is preserved: groups appear in first-seen order and the
    /// files inside a group keep the order `inputs` enumerated them in.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::Resolve`] only under the strict ambiguity
    ///   policy. The default policy classifies every path.
    pub fn build_file_groups(&self, inputs: &[impl AsRef<str>]) -> Result<FileGroups> {
        let mut groups = FileGroups::default();
        for input in inputs {
            let identity = self.resolver.classify(input.as_ref())?;
            let output = self.resolver.resolve_output_path(&identity);
            debug!("{} packages into {output}", input.as_ref());
            groups.insert(output, self.resolver.normalize(input.as_ref()));
        }
        Ok(groups)
    }

    /// Wrap one object's code with its traceability banner.
    ///
    /// The statement terminator `/` is appended only for source objects.
    /// Opaque scripts terminate their own statements, and tacking a `/`
    /// onto one would re-execute its last statement.
    pub fn wrap_object(code: &str, identity: &ObjectIdentity) -> String {
        let mut out = String::new();
        out.push_str(BANNER);
        out.push('\n');
        out.push_str(&format!("PROMPT {identity}\n"));
        out.push_str(BANNER);
        out.push('\n');
        out.push_str(code);
        if !code.ends_with('\n') {
            out.push('\n');
        }
        if identity.is_source {
            out.push_str("/\n");
        }
        out
    }

    /// Wrap one concatenated script body with the transactional frame.
    ///
    /// Frame order: timestamp/version comment, `SPOOL`, session settings,
    /// body, `COMMIT;`, `SPOOL OFF`.
    pub fn wrap_script(&self, output_path: &str, body: &str) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let version = &self.definition.version.number;
        let log_name = spool_log_name(output_path);

        let mut out = String::new();
        out.push_str(&format!("-- Deploy version: {version} generated {timestamp}\n"));
        out.push_str(&format!("SPOOL {log_name}\n"));
        out.push_str("SET DEFINE OFF\n");
        out.push_str("SET VERIFY OFF\n");
        out.push_str("SET FEEDBACK ON\n");
        out.push('\n');
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("COMMIT;\n");
        out.push_str("SPOOL OFF\n");
        out
    }

    /// Package the configured input set into deploy scripts.
    ///
    /// Returns `(output path, script text)` pairs in first-seen group
    /// order. In-memory only; nothing is written to disk.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::ChangeSet`] if an input or exclude glob is
    ///   malformed.
    /// - Return [`PackageError::ReadInput`] if an input file cannot be
    ///   read.
    /// - Return [`PackageError::Render`] if the templating pass fails.
    #[instrument(skip(self), level = "debug")]
    pub fn package(&self) -> Result<Vec<(String, String)>> {
        let mut patterns = self.definition.package.input.clone();
        patterns.extend(
            self.definition
                .package
                .exclude
                .iter()
                .map(|pattern| format!("!{}", pattern.trim_start_matches('!'))),
        );

        let inputs = changeset::expand(&patterns)?;
        if inputs.is_empty() {
            warn!("input globs match no files, nothing to package");
            return Ok(Vec::new());
        }

        let groups = self.build_file_groups(&inputs)?;
        debug!("packaging {} files into {} scripts", inputs.len(), groups.len());

        let mut scripts = Vec::new();
        for group in groups.iter() {
            let mut body = String::new();
            for input in &group.inputs {
                let code = fs::read(input.as_str()).map_err(|source| PackageError::ReadInput {
                    path: input.clone(),
                    source,
                })?;
                let code = String::from_utf8_lossy(&code).into_owned();

                let code = if self.definition.package.templating {
                    self.renderer.render(&code)?
                } else {
                    code
                };

                let identity = self.resolver.classify(input)?;
                body.push_str(&Self::wrap_object(&code, &identity));
                body.push('\n');
            }

            scripts.push((group.output.clone(), self.wrap_script(&group.output, &body)));
        }

        Ok(scripts)
    }
}

/// Log file name for a deploy script, derived from its base name.
fn spool_log_name(output_path: &str) -> String {
    let name = output_path.rsplit('/').next().unwrap_or(output_path);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    format!("deploy-{stem}.log")
}

/// Packaging error types.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// Pattern configuration or strict classification fails.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Input or exclude glob fails to parse.
    #[error(transparent)]
    ChangeSet(#[from] ChangeSetError),

    /// Input file cannot be read.
    #[error("failed to read packaging input {path:?}")]
    ReadInput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Templating pass fails.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Friendly result alias :3
pub type Result<T, E = PackageError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn packager() -> Packager {
        Packager::new(ProjectDefinition::default()).unwrap()
    }

    #[test]
    fn file_groups_keep_first_seen_order() {
        let mut groups = FileGroups::default();
        groups.insert("./deploy/HR/run.sql", "./src/HR/VIEWS/v1.sql");
        groups.insert("./deploy/SCOTT/run.sql", "./src/SCOTT/VIEWS/v9.sql");
        groups.insert("./deploy/HR/run.sql", "./src/HR/VIEWS/v2.sql");

        let outputs: Vec<&str> = groups.iter().map(|group| group.output.as_str()).collect();
        assert_eq!(outputs, vec!["./deploy/HR/run.sql", "./deploy/SCOTT/run.sql"]);

        let hr = groups.iter().next().unwrap();
        assert_eq!(hr.inputs, vec!["./src/HR/VIEWS/v1.sql", "./src/HR/VIEWS/v2.sql"]);
    }

    #[test]
    fn build_file_groups_groups_by_schema() {
        let groups = packager()
            .build_file_groups(&[
                "./src/HR/PACKAGES/my_pck.sql",
                "./src/SCOTT/VIEWS/v1.sql",
                "./src/HR/PACKAGE_BODIES/my_pck.sql",
            ])
            .unwrap();

        assert_eq!(groups.len(), 2);

        let hr = groups.iter().next().unwrap();
        assert_eq!(hr.output, "./deploy/HR/run.sql");
        assert_eq!(
            hr.inputs,
            vec!["./src/HR/PACKAGES/my_pck.sql", "./src/HR/PACKAGE_BODIES/my_pck.sql"]
        );
    }

    #[test]
    fn wrap_object_terminates_source_objects_only() {
        let source = ObjectIdentity {
            owner: Some("HR".into()),
            object_type: ObjectType::PackageBody,
            object_name: "my_pck1".into(),
            is_source: true,
            is_script: false,
        };
        let script = ObjectIdentity {
            owner: Some("HR".into()),
            object_type: ObjectType::Script,
            object_name: "initial_dml".into(),
            is_source: false,
            is_script: true,
        };

        let wrapped = Packager::<NoTemplating>::wrap_object("select 1 from dual;", &source);
        assert!(wrapped.ends_with("select 1 from dual;\n/\n"));
        assert!(wrapped.contains("PROMPT HR: PACKAGE BODY my_pck1\n"));

        let wrapped = Packager::<NoTemplating>::wrap_object("insert into t values (1);\n", &script);
        assert!(wrapped.ends_with("insert into t values (1);\n"));
        assert!(!wrapped.ends_with("/\n"));
    }

    #[test]
    fn wrap_object_banner_shape() {
        let identity = ObjectIdentity {
            owner: Some("HR".into()),
            object_type: ObjectType::View,
            object_name: "v_emp".into(),
            is_source: true,
            is_script: false,
        };

        let wrapped = Packager::<NoTemplating>::wrap_object("select * from emp", &identity);
        let expect = indoc! {"
            PROMPT ********************************************************************
            PROMPT HR: VIEW v_emp
            PROMPT ********************************************************************
            select * from emp
            /
        "};
        assert_eq!(wrapped, expect);
    }

    #[test]
    fn wrap_script_frame_order() {
        let script = packager().wrap_script("./deploy/HR/run.sql", "PROMPT body\n");
        let lines: Vec<&str> = script.lines().collect();

        assert!(lines[0].starts_with("-- Deploy version: 0.0.1 generated "));
        assert_eq!(lines[1], "SPOOL deploy-run.log");
        assert_eq!(lines[2], "SET DEFINE OFF");
        assert_eq!(lines[3], "SET VERIFY OFF");
        assert_eq!(lines[4], "SET FEEDBACK ON");

        // Exactly one SPOOL directive before the body, SPOOL OFF last.
        assert_eq!(script.matches("SPOOL ").count(), 2);
        let last = lines.iter().rev().find(|line| !line.trim().is_empty()).unwrap();
        assert_eq!(*last, "SPOOL OFF");
        assert_eq!(lines[lines.len() - 2], "COMMIT;");
    }

    #[test]
    fn spool_log_name_uses_base_name() {
        assert_eq!(spool_log_name("./deploy/HR/run.sql"), "deploy-run.log");
        assert_eq!(spool_log_name("install.sql"), "deploy-install.log");
    }
}
