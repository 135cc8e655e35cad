// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use orapack::{
    package::{manifest::bill_of_lading, templating::VarTemplater},
    Packager, ProjectDefinition,
};

use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::fs;

/// Lay down a two-schema project tree in the current directory.
fn scaffold_project() {
    fs::create_dir_all("src/HR/PACKAGES").unwrap();
    fs::create_dir_all("src/HR/PACKAGE_BODIES").unwrap();
    fs::create_dir_all("src/HR/DATA").unwrap();
    fs::create_dir_all("src/SCOTT/VIEWS").unwrap();

    fs::write(
        "src/HR/PACKAGES/my_pck.sql",
        "create or replace package my_pck as\nend my_pck;\n",
    )
    .unwrap();
    fs::write(
        "src/HR/PACKAGE_BODIES/my_pck.sql",
        "create or replace package body my_pck as\nend my_pck;\n",
    )
    .unwrap();
    fs::write("src/HR/DATA/seed.sql", "insert into t values (1);\n").unwrap();
    fs::write(
        "src/SCOTT/VIEWS/v_dept.sql",
        "create or replace view v_dept as select * from dept\n",
    )
    .unwrap();
}

#[sealed_test]
fn package_produces_one_script_per_schema() {
    scaffold_project();

    let scripts = Packager::new(ProjectDefinition::default())
        .unwrap()
        .package()
        .unwrap();

    let outputs: Vec<&str> = scripts.iter().map(|(output, _)| output.as_str()).collect();
    assert_eq!(outputs, vec!["./deploy/HR/run.sql", "./deploy/SCOTT/run.sql"]);
}

#[sealed_test]
fn packaged_script_carries_the_full_frame() {
    scaffold_project();

    let scripts = Packager::new(ProjectDefinition::default())
        .unwrap()
        .package()
        .unwrap();
    let (_, hr_script) = &scripts[0];

    assert!(hr_script.starts_with("-- Deploy version: 0.0.1 generated "));
    assert!(hr_script.contains("SPOOL deploy-run.log\n"));
    assert!(hr_script.contains("PROMPT HR: PACKAGE my_pck\n"));
    assert!(hr_script.contains("PROMPT HR: PACKAGE BODY my_pck\n"));
    assert!(hr_script.ends_with("COMMIT;\nSPOOL OFF\n"));

    // Source objects get the block terminator, data scripts do not.
    assert!(hr_script.contains("end my_pck;\n/\n"));
    assert!(!hr_script.contains("insert into t values (1);\n/\n"));
}

#[sealed_test]
fn package_runs_the_templating_pass_when_enabled() {
    fs::create_dir_all("src/HR/VIEWS").unwrap();
    fs::write(
        "src/HR/VIEWS/v_emp.sql",
        "create or replace view v_emp as select * from emp@{{db.link}}\n",
    )
    .unwrap();

    let mut definition = ProjectDefinition::default();
    definition.package.templating = true;

    let scripts = Packager::new(definition)
        .unwrap()
        .with_renderer(VarTemplater::new([("db.link", "proddb")]))
        .package()
        .unwrap();

    assert!(scripts[0].1.contains("select * from emp@proddb\n"));
}

#[sealed_test]
fn package_honors_exclude_globs() {
    scaffold_project();

    let mut definition = ProjectDefinition::default();
    definition.package.exclude = vec!["./src/**/DATA/*.sql".into()];

    let scripts = Packager::new(definition).unwrap().package().unwrap();
    let (_, hr_script) = &scripts[0];

    assert!(!hr_script.contains("insert into t values (1);"));
}

#[sealed_test]
fn manifest_lists_every_packaged_object() {
    scaffold_project();

    let definition = ProjectDefinition::default();
    let resolver = definition.resolver().unwrap();
    let inputs = orapack::changeset::expand(&definition.package.input).unwrap();

    let manifest = bill_of_lading(&resolver, &inputs).unwrap();

    assert!(manifest.contains("### HR\n"));
    assert!(manifest.contains("### SCOTT\n"));
    assert!(manifest.contains("#### PACKAGE BODY\n"));
    assert!(manifest.contains("- my_pck\n"));
    assert!(manifest.contains("- v_dept\n"));
    // The data script rides along as an opaque script entry.
    assert!(manifest.contains("#### script\n"));
    assert!(manifest.contains("- seed\n"));
}
