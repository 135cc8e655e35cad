// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bill of lading generation.
//!
//! The bill of lading is the human-readable manifest that rides along with
//! a deployment: every object in the shipment, grouped by owning schema and
//! object type, rendered as nested Markdown headings. Reviewers read it to
//! see at a glance what a deploy script will touch.
//!
//! Grouping order is first-seen order, not alphabetical. The manifest is
//! visible output whose shape people diff between releases, so reordering
//! it would show up as churn.

use crate::object::{ObjectIdentity, PathResolver, Result};

/// One manifest entry.
///
/// `excluded` records whether the path arrived with a leading `!`. The
/// flag is carried but does not change rendering yet; excluded entries
/// list like any other.
// TODO: render excluded entries distinctly once the listing format settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub identity: ObjectIdentity,
    pub excluded: bool,
}

/// Build the bill of lading for a set of file paths.
///
/// Classifies every path and renders nested Markdown headings: `### owner`,
/// `#### objectType`, then one `- objectName` bullet per object. Groups
/// appear in the order their first member appeared in `paths`.
///
/// # Errors
///
/// - Return a classification error only under the strict ambiguity policy.
pub fn bill_of_lading(resolver: &PathResolver, paths: &[impl AsRef<str>]) -> Result<String> {
    let mut owners: Vec<(String, Vec<(String, Vec<String>)>)> = Vec::new();

    for path in paths {
        let entry = classify_entry(resolver, path.as_ref())?;
        let owner = entry
            .identity
            .owner
            .clone()
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let kind = entry.identity.ora_type().to_string();

        let owner_slot = match owners.iter().position(|(candidate, _)| *candidate == owner) {
            Some(found) => found,
            None => {
                owners.push((owner, Vec::new()));
                owners.len() - 1
            }
        };
        let types = &mut owners[owner_slot].1;

        let type_slot = match types.iter().position(|(candidate, _)| *candidate == kind) {
            Some(found) => found,
            None => {
                types.push((kind, Vec::new()));
                types.len() - 1
            }
        };

        types[type_slot].1.push(entry.identity.object_name);
    }

    let mut out = String::new();
    for (owner, types) in owners {
        out.push_str(&format!("### {owner}\n\n"));
        for (kind, names) in types {
            out.push_str(&format!("#### {kind}\n\n"));
            for name in names {
                out.push_str(&format!("- {name}\n"));
            }
            out.push('\n');
        }
    }

    Ok(out)
}

fn classify_entry(resolver: &PathResolver, path: &str) -> Result<Entry> {
    let excluded = path.starts_with('!');
    let path = path.trim_start_matches('!');

    Ok(Entry {
        identity: resolver.classify(path)?,
        excluded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectDefinition;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn resolver() -> PathResolver {
        ProjectDefinition::default().resolver().unwrap()
    }

    #[test]
    fn groups_by_owner_then_type_in_first_seen_order() {
        let result = bill_of_lading(
            &resolver(),
            &[
                "./src/HR/PACKAGE_BODIES/my_pck1.sql",
                "./src/SCOTT/VIEWS/v_dept.sql",
                "./src/HR/VIEWS/v_emp.sql",
                "./src/HR/PACKAGE_BODIES/my_pck2.sql",
            ],
        )
        .unwrap();

        let expect = indoc! {"
            ### HR

            #### PACKAGE BODY

            - my_pck1
            - my_pck2

            #### VIEW

            - v_emp

            ### SCOTT

            #### VIEW

            - v_dept

        "};
        assert_eq!(result, expect);
    }

    #[test]
    fn unclassifiable_paths_list_as_scripts() {
        let result = bill_of_lading(&resolver(), &["./scripts/HR/initial_dml.sql"]).unwrap();

        let expect = indoc! {"
            ### HR

            #### script

            - initial_dml

        "};
        assert_eq!(result, expect);
    }

    #[test]
    fn excluded_entries_render_like_any_other() {
        let marked = bill_of_lading(&resolver(), &["!./src/HR/VIEWS/v_emp.sql"]).unwrap();
        let plain = bill_of_lading(&resolver(), &["./src/HR/VIEWS/v_emp.sql"]).unwrap();
        assert_eq!(marked, plain);
    }

    #[test]
    fn entry_tracks_exclusion_flag() {
        let entry = classify_entry(&resolver(), "!./src/HR/VIEWS/v_emp.sql").unwrap();
        assert!(entry.excluded);
        assert_eq!(entry.identity.object_name, "v_emp");
    }
}
