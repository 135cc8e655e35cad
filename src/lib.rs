// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Map Oracle PL/SQL source trees to database objects, and package them
//! into deploy scripts.
//!
//! An orapack project keeps every database object as one file in a
//! version-controlled source tree. Where each kind of object lives is
//! declared through path patterns in the project definition, so the same
//! machinery maps files to objects and objects back to files. On top of
//! that mapping sits the packaging engine, which collects tracked source
//! files, groups them per owning schema, and concatenates each group into
//! one deployable SQL script with a transactional frame.
//!
//! # Layers
//!
//! - [`pattern`] compiles path patterns and inverts them.
//! - [`object`] classifies paths into object identities and back.
//! - [`changeset`] resolves glob patterns into working file sets.
//! - [`package`] assembles deploy scripts and the bill of lading.
//! - [`problem`] models compile and deployment diagnostics.
//! - [`config`] declares the project definition file layout.

pub mod changeset;
pub mod config;
pub mod object;
pub mod package;
pub mod pattern;
pub mod problem;

pub use config::ProjectDefinition;
pub use object::{MatchPolicy, ObjectIdentity, ObjectType, PathResolver};
pub use package::Packager;
pub use pattern::CompiledPattern;
pub use problem::{ErrorList, ErrorRecord};
