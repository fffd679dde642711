//! Install and uninstall planning against in-memory catalogs.

use std::collections::HashSet;

use depot::MemoryCatalog;
use depot::resolver::InstallOperation;
use depot_test_utils::*;

/// (package, version, install) triples for easy comparison.
fn summarize(ops: &[InstallOperation]) -> Vec<(String, String, bool)> {
	ops.iter()
		.map(|op| (op.package.clone(), op.version.to_string(), op.install))
		.collect()
}

fn entry(package: &str, v: &str, install: bool) -> (String, String, bool) {
	(package.to_string(), v.to_string(), install)
}

/// `test.A 1.0` depends on `test.B [1.0, 2.0)`; B has 1.0, 1.5 and 2.0.
fn catalog_with_choice() -> MemoryCatalog {
	let mut db = MemoryCatalog::default();
	db.add_package(package("test.A"));
	db.add_package(package("test.B"));

	let mut a = package_version("test.A", "1.0");
	a.dependencies.push(dependency("test.B [1.0, 2.0)"));
	db.add_package_version(a);

	db.add_package_version(package_version("test.B", "1.0"));
	db.add_package_version(package_version("test.B", "1.5"));
	db.add_package_version(package_version("test.B", "2.0"));
	db
}

#[test]
fn newest_version_satisfying_the_range_is_chosen() {
	let (depot, _root) = depot_with(catalog_with_choice(), vec![]);

	let ops = depot.plan_install(&["test.A".to_string()], None).expect("planning failed");

	assert_eq!(summarize(&ops), vec![
		entry("test.B", "1.5", true),
		entry("test.A", "1.0", true),
	]);
}

#[test]
fn short_names_resolve_to_the_full_package() {
	let (depot, _root) = depot_with(catalog_with_choice(), vec![]);

	let ops = depot.plan_install(&["A".to_string()], None).expect("planning failed");
	assert_eq!(ops.last().unwrap().package, "test.A");
}

#[test]
fn shared_dependencies_are_planned_once() {
	let mut db = MemoryCatalog::default();
	for name in ["test.A", "test.B", "test.C", "test.D"] {
		db.add_package(package(name));
	}

	let mut a = package_version("test.A", "1.0");
	a.dependencies.push(dependency("test.B [1.0, 1.0]"));
	a.dependencies.push(dependency("test.C [1.0, 1.0]"));
	db.add_package_version(a);

	let mut b = package_version("test.B", "1.0");
	b.dependencies.push(dependency("test.D [1.0, 1.0]"));
	db.add_package_version(b);

	let mut c = package_version("test.C", "1.0");
	c.dependencies.push(dependency("test.D [1.0, 1.0]"));
	db.add_package_version(c);

	db.add_package_version(package_version("test.D", "1.0"));

	let (depot, _root) = depot_with(db, vec![]);
	let ops = depot.plan_install(&["test.A".to_string()], None).expect("planning failed");

	assert_eq!(summarize(&ops), vec![
		entry("test.D", "1.0", true),
		entry("test.B", "1.0", true),
		entry("test.C", "1.0", true),
		entry("test.A", "1.0", true),
	]);
}

#[test]
fn dependency_cycles_terminate_with_unsatisfiable() {
	let mut db = MemoryCatalog::default();
	db.add_package(package("test.A"));
	db.add_package(package("test.B"));

	let mut a = package_version("test.A", "1.0");
	a.dependencies.push(dependency("test.B [1.0, 1.0]"));
	db.add_package_version(a);

	let mut b = package_version("test.B", "1.0");
	b.dependencies.push(dependency("test.A [1.0, 1.0]"));
	db.add_package_version(b);

	let (depot, _root) = depot_with(db, vec![]);
	let result = depot.plan_install(&["test.A".to_string()], None);

	assert!(matches!(result, Err(depot::Error::Unsatisfiable(_))));
}

#[test]
fn installed_target_plans_nothing() {
	let (depot, root) = depot_with(catalog_with_choice(), vec![]);
	mark_installed(&depot, "test.B", "1.5", &root.path().join("apps/B"));
	mark_installed(&depot, "test.A", "1.0", &root.path().join("apps/A"));

	let ops = depot.plan_install(&["test.A".to_string()], None).expect("planning failed");
	assert!(ops.is_empty());
}

#[test]
fn satisfied_dependencies_are_not_reinstalled() {
	let (depot, root) = depot_with(catalog_with_choice(), vec![]);
	mark_installed(&depot, "test.B", "1.0", &root.path().join("apps/B"));

	let ops = depot.plan_install(&["test.A".to_string()], None).expect("planning failed");
	assert_eq!(summarize(&ops), vec![entry("test.A", "1.0", true)]);
}

#[test]
fn missing_dependency_is_unsatisfiable() {
	let mut db = MemoryCatalog::default();
	db.add_package(package("test.A"));

	let mut a = package_version("test.A", "1.0");
	a.dependencies.push(dependency("test.Missing [1.0, 2.0)"));
	db.add_package_version(a);

	let (depot, _root) = depot_with(db, vec![]);
	assert!(matches!(
		depot.plan_install(&["test.A".to_string()], None),
		Err(depot::Error::Unsatisfiable(_))
	));
}

#[test]
fn candidates_without_a_download_are_not_eligible() {
	let mut db = MemoryCatalog::default();
	db.add_package(package("test.A"));
	db.add_package(package("test.B"));

	let mut a = package_version("test.A", "1.0");
	a.dependencies.push(dependency("test.B [1.0, 2.0)"));
	db.add_package_version(a);

	let mut b = package_version("test.B", "1.5");
	b.download = None;
	db.add_package_version(b);

	let (depot, _root) = depot_with(db, vec![]);
	assert!(matches!(
		depot.plan_install(&["test.A".to_string()], None),
		Err(depot::Error::Unsatisfiable(_))
	));
}

#[test]
fn plans_never_repeat_an_operation() {
	/* two targets pulling the same dependency still plan it once */
	let (depot, _root) = depot_with(catalog_with_choice(), vec![]);

	let resolver = depot.resolver();
	let mut installed = resolver.installed_snapshot();
	let mut ops = Vec::new();

	for name in ["test.A", "test.B"] {
		let pv = resolver.find_newest_installable(name).expect("fixture package missing");
		let mut avoid = HashSet::new();
		ops.extend(resolver.plan_installation(&pv, &mut installed, &mut avoid, None).expect("planning failed"));
	}

	let mut seen = HashSet::new();
	for op in &ops {
		assert!(seen.insert((op.string_id(), op.install)), "{} planned twice", op);
	}
}

#[test]
fn uninstall_orders_dependents_before_the_dependency() {
	let mut db = MemoryCatalog::default();
	db.add_package(package("test.A"));
	db.add_package(package("test.B"));

	db.add_package_version(package_version("test.A", "1.0"));
	let mut b = package_version("test.B", "1.0");
	b.dependencies.push(dependency("test.A [1.0, 2.0)"));
	db.add_package_version(b);

	let (depot, root) = depot_with(db, vec![]);
	mark_installed(&depot, "test.A", "1.0", &root.path().join("apps/A"));
	mark_installed(&depot, "test.B", "1.0", &root.path().join("apps/B"));

	let ops = depot.plan_remove(&["test.A".to_string()]).expect("planning failed");
	assert_eq!(summarize(&ops), vec![
		entry("test.B", "1.0", false),
		entry("test.A", "1.0", false),
	]);
}

#[test]
fn uninstall_spares_dependents_with_another_provider() {
	let mut db = MemoryCatalog::default();
	db.add_package(package("test.A"));
	db.add_package(package("test.B"));

	db.add_package_version(package_version("test.A", "1.0"));
	db.add_package_version(package_version("test.A", "1.5"));
	let mut b = package_version("test.B", "1.0");
	b.dependencies.push(dependency("test.A [1.0, 2.0)"));
	db.add_package_version(b);

	let (depot, root) = depot_with(db, vec![]);
	mark_installed(&depot, "test.A", "1.0", &root.path().join("apps/A"));
	mark_installed(&depot, "test.A", "1.5", &root.path().join("apps/A-1.5"));
	mark_installed(&depot, "test.B", "1.0", &root.path().join("apps/B"));

	let resolver = depot.resolver();
	let mut installed = resolver.installed_snapshot();
	let pv = depot.catalog().find_package_version("test.A", &version("1.0")).expect("fixture version missing");
	let ops = resolver.plan_uninstallation(&pv, &mut installed).expect("planning failed");

	assert_eq!(summarize(&ops), vec![entry("test.A", "1.0", false)]);
}

#[test]
fn cascading_uninstalls_cover_transitive_dependents() {
	/* C depends on B depends on A: removing A removes C then B then A */
	let mut db = MemoryCatalog::default();
	for name in ["test.A", "test.B", "test.C"] {
		db.add_package(package(name));
	}
	db.add_package_version(package_version("test.A", "1.0"));
	let mut b = package_version("test.B", "1.0");
	b.dependencies.push(dependency("test.A [1.0, 2.0)"));
	db.add_package_version(b);
	let mut c = package_version("test.C", "1.0");
	c.dependencies.push(dependency("test.B [1.0, 2.0)"));
	db.add_package_version(c);

	let (depot, root) = depot_with(db, vec![]);
	mark_installed(&depot, "test.A", "1.0", &root.path().join("apps/A"));
	mark_installed(&depot, "test.B", "1.0", &root.path().join("apps/B"));
	mark_installed(&depot, "test.C", "1.0", &root.path().join("apps/C"));

	let ops = depot.plan_remove(&["test.A".to_string()]).expect("planning failed");
	assert_eq!(summarize(&ops), vec![
		entry("test.C", "1.0", false),
		entry("test.B", "1.0", false),
		entry("test.A", "1.0", false),
	]);
}
