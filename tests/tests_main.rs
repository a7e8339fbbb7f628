#[path = "helpers/mod.rs"]
mod helpers;

#[path = "hir/mod.rs"]
mod hir;

#[path = "ide/mod.rs"]
mod ide;

#[path = "project/mod.rs"]
mod project;
