use std::collections::BTreeMap;

use crdgate_core::{
    CheckResult, CrdLookup, CustomResourceDefinition, LookupError, Preflight, PreflightError,
    RecordedResults, Release, RunnerConfig, ValidationRegistry, ValidationResults,
    ValidationRunner,
};

fn crd_doc(name: &str) -> String {
    format!(
        "apiVersion: apiextensions.k8s.io/v1\nkind: CustomResourceDefinition\nmetadata:\n  name: {name}\nspec:\n  group: example.com\n  scope: Namespaced\n  versions:\n    - name: v1\n      served: true\n      storage: true\n"
    )
}

fn installed(names: &[&str]) -> BTreeMap<String, CustomResourceDefinition> {
    names
        .iter()
        .map(|name| {
            let objs = crdgate_core::manifest_objects(&crd_doc(name), "installed").unwrap();
            (name.to_string(), objs[0].to_crd().unwrap())
        })
        .collect()
}

fn release(names: &[&str]) -> Release {
    let mut manifest = String::from(
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: settings\n",
    );
    for name in names {
        manifest.push_str("---\n");
        manifest.push_str(&crd_doc(name));
    }
    Release::new("demo", manifest)
}

fn failures(crd_checks: &[(&str, &str)]) -> ValidationResults {
    ValidationResults {
        crd_validation: crd_checks
            .iter()
            .map(|(check, raw)| CheckResult::new(*check, vec![raw.to_string()]))
            .collect(),
        ..Default::default()
    }
}

/// Emits canned results keyed by the proposed CRD's name.
#[derive(Default)]
struct FakeRegistry {
    results: BTreeMap<String, ValidationResults>,
}

struct FakeRunner<'a> {
    registry: &'a FakeRegistry,
}

impl ValidationRunner for FakeRunner<'_> {
    fn run(
        &self,
        _old: &CustomResourceDefinition,
        new: &CustomResourceDefinition,
    ) -> ValidationResults {
        self.registry
            .results
            .get(new.name())
            .cloned()
            .unwrap_or_default()
    }
}

impl ValidationRegistry for FakeRegistry {
    fn runner<'a>(
        &'a self,
        _config: &RunnerConfig,
    ) -> anyhow::Result<Box<dyn ValidationRunner + 'a>> {
        Ok(Box::new(FakeRunner { registry: self }))
    }
}

struct FailingRegistry;

impl ValidationRegistry for FailingRegistry {
    fn runner<'a>(
        &'a self,
        _config: &RunnerConfig,
    ) -> anyhow::Result<Box<dyn ValidationRunner + 'a>> {
        anyhow::bail!("registry unavailable")
    }
}

/// Panics if a runner is ever asked to compare anything.
struct UnreachableRegistry;

struct UnreachableRunner;

impl ValidationRunner for UnreachableRunner {
    fn run(&self, _: &CustomResourceDefinition, _: &CustomResourceDefinition) -> ValidationResults {
        panic!("runner consulted for a CRD with no installed version")
    }
}

impl ValidationRegistry for UnreachableRegistry {
    fn runner<'a>(
        &'a self,
        _config: &RunnerConfig,
    ) -> anyhow::Result<Box<dyn ValidationRunner + 'a>> {
        Ok(Box::new(UnreachableRunner))
    }
}

struct BrokenLookup;

impl CrdLookup for BrokenLookup {
    fn get(&self, _name: &str) -> Result<CustomResourceDefinition, LookupError> {
        Err(anyhow::anyhow!("connection refused").into())
    }
}

#[test]
fn missing_release_is_a_no_op() {
    let preflight = Preflight::new(BrokenLookup).with_registry(FailingRegistry);
    assert!(preflight.install(None).is_ok());
    assert!(preflight.upgrade(None).is_ok());
}

#[test]
fn crd_without_installed_version_is_allowed_without_running_checks() {
    let preflight = Preflight::new(installed(&[])).with_registry(UnreachableRegistry);
    let rel = release(&["widgets.example.com"]);
    assert!(preflight.install(Some(&rel)).is_ok());
    assert!(preflight.upgrade(Some(&rel)).is_ok());
}

#[test]
fn clean_results_allow_the_upgrade() {
    let preflight =
        Preflight::new(installed(&["widgets.example.com"])).with_registry(FakeRegistry::default());
    assert!(preflight
        .upgrade(Some(&release(&["widgets.example.com"])))
        .is_ok());
}

#[test]
fn minor_only_failures_do_not_block() {
    let mut registry = FakeRegistry::default();
    registry.results.insert(
        "widgets.example.com".to_string(),
        failures(&[("description", "field description updated")]),
    );
    let preflight = Preflight::new(installed(&["widgets.example.com"])).with_registry(registry);
    assert!(preflight
        .upgrade(Some(&release(&["widgets.example.com"])))
        .is_ok());
}

#[test]
fn breaking_changes_block_with_a_rendered_report() {
    let mut registry = FakeRegistry::default();
    registry.results.insert(
        "widgets.example.com".to_string(),
        failures(&[
            ("existingFieldRemoval", "existing field 'spec.legacy' removed"),
            ("type", "type changed from string to integer"),
        ]),
    );
    let preflight = Preflight::new(installed(&["widgets.example.com"])).with_registry(registry);

    let err = preflight
        .upgrade(Some(&release(&["widgets.example.com"])))
        .unwrap_err();
    let rejection = err.rejection().expect("policy rejection");
    assert_eq!(rejection.blocked().len(), 1);
    assert_eq!(
        err.to_string(),
        "CRD \"widgets.example.com\" upgrade blocked: CRD Upgrade Safety\n\
Total: 2 (1 critical, 1 breaking)\n\
Issues:\n\
- Field removal detected (existingFieldRemoval): The OLM preflight blocked our CRD update because it isn't backwards-compatible. Please rework the change to be additive: avoid removing fields.\n\
- Type changed (type): string → integer. The OLM preflight blocked our CRD update because it isn't backwards-compatible. Don't change types in place - add a new CRD version instead."
    );
}

#[test]
fn rejections_from_several_crds_are_joined_in_manifest_order() {
    let mut registry = FakeRegistry::default();
    registry.results.insert(
        "b.example.com".to_string(),
        failures(&[("scope", r#"scope changed from "Namespaced" to "Cluster""#)]),
    );
    registry.results.insert(
        "a.example.com".to_string(),
        failures(&[("required", "required field 'spec.x' added")]),
    );
    let preflight = Preflight::new(installed(&[
        "a.example.com",
        "b.example.com",
        "c.example.com",
    ]))
    .with_registry(registry);

    let err = preflight
        .upgrade(Some(&release(&[
            "b.example.com",
            "c.example.com",
            "a.example.com",
        ])))
        .unwrap_err();
    let names: Vec<&str> = err
        .rejection()
        .expect("policy rejection")
        .blocked()
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, vec!["b.example.com", "a.example.com"]);

    let text = err.to_string();
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with("CRD \""))
        .collect();
    assert_eq!(lines.len(), 2);
}

#[test]
fn lookup_failure_is_fatal_and_names_the_crd() {
    let preflight = Preflight::new(BrokenLookup).with_registry(FakeRegistry::default());
    let err = preflight
        .upgrade(Some(&release(&["widgets.example.com"])))
        .unwrap_err();
    assert!(matches!(err, PreflightError::Fatal(_)));
    let msg = format!("{:#}", anyhow::Error::from(err));
    assert!(
        msg.contains("getting existing resource for CRD \"widgets.example.com\""),
        "{msg}"
    );
    assert!(msg.contains("connection refused"), "{msg}");
}

#[test]
fn runner_creation_failure_is_fatal() {
    let preflight = Preflight::new(installed(&[])).with_registry(FailingRegistry);
    let err = preflight.upgrade(Some(&release(&[]))).unwrap_err();
    let msg = format!("{:#}", anyhow::Error::from(err));
    assert!(msg.contains("creating CRD validation runner"), "{msg}");
}

#[test]
fn unparseable_manifest_is_fatal() {
    let preflight = Preflight::new(installed(&[]));
    let err = preflight
        .upgrade(Some(&Release::new("broken", "- just\n- a list\n")))
        .unwrap_err();
    let msg = format!("{:#}", anyhow::Error::from(err));
    assert!(msg.contains("parsing release \"broken\" objects"), "{msg}");
}

#[test]
fn recorded_results_apply_the_default_policy() {
    let recorded = RecordedResults::new().with_crd(
        "widgets.example.com",
        failures(&[("description", "description removed from spec.notes")]),
    );
    let preflight = Preflight::new(installed(&["widgets.example.com"])).with_registry(recorded);
    assert!(preflight
        .upgrade(Some(&release(&["widgets.example.com"])))
        .is_ok());
}
