use noxis::core::discovery::discover;
use noxis::core::project::{ProjectModel, RepoType, SignalMap};
use std::fs;
use tempfile::tempdir;

#[test]
fn pyproject_only_is_a_single_python_repo() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("pyproject.toml"), "[project]\nname = \"demo\"\n").expect("write");

    let model = discover(tmp.path()).expect("discover");
    assert_eq!(model.languages_detected, vec!["python".to_string()]);
    assert_eq!(model.repo_type, RepoType::Single);
    assert_eq!(model.signals.len(), 1);
    assert_eq!(
        model.signals.get("python"),
        Some(&["pyproject.toml".to_string()][..])
    );
}

#[test]
fn package_json_with_packages_dir_is_a_node_monorepo() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("package.json"), "{}").expect("write");
    fs::create_dir(tmp.path().join("packages")).expect("mkdir");

    let model = discover(tmp.path()).expect("discover");
    assert!(model.has_language("node"));
    assert_eq!(model.repo_type, RepoType::Mono);
}

#[test]
fn apps_file_is_not_a_monorepo_marker() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("apps"), "not a directory").expect("write");
    assert_eq!(discover(tmp.path()).expect("discover").repo_type, RepoType::Single);
}

#[test]
fn docker_is_a_signal_but_never_a_language() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("Dockerfile"), "FROM scratch\n").expect("write");
    fs::write(tmp.path().join("compose.yml"), "services: {}\n").expect("write");

    let model = discover(tmp.path()).expect("discover");
    assert!(model.languages_detected.is_empty());
    assert_eq!(
        model.signals.get("docker"),
        Some(&["Dockerfile".to_string(), "compose.yml".to_string()][..])
    );
}

#[test]
fn discovery_is_deterministic_and_keeps_table_order() {
    let tmp = tempdir().expect("tempdir");
    for name in ["package.json", "composer.json", "requirements.txt", "setup.py", "Dockerfile"] {
        fs::write(tmp.path().join(name), "").expect("write");
    }

    let first = discover(tmp.path()).expect("first");
    let second = discover(tmp.path()).expect("second");
    assert_eq!(first, second);
    assert_eq!(first.to_yaml().expect("yaml"), second.to_yaml().expect("yaml"));

    assert_eq!(first.languages_detected, vec!["python", "php", "node"]);
    let groups: Vec<&str> = first.signals.iter().map(|(g, _)| g).collect();
    assert_eq!(groups, vec!["python", "php", "node", "docker"]);
    assert_eq!(
        first.signals.get("python"),
        Some(&["requirements.txt".to_string(), "setup.py".to_string()][..])
    );
}

#[test]
fn detected_languages_always_have_signals() {
    let tmp = tempdir().expect("tempdir");
    for name in ["Pipfile", "rocks.toml", "composer.json"] {
        fs::write(tmp.path().join(name), "").expect("write");
    }
    let model = discover(tmp.path()).expect("discover");
    model.check_invariants().expect("invariant holds");
    for language in &model.languages_detected {
        assert!(model.signals.has_evidence(language));
    }
}

#[test]
fn missing_root_is_an_error() {
    let tmp = tempdir().expect("tempdir");
    assert!(discover(&tmp.path().join("does-not-exist")).is_err());
}

#[test]
fn snapshot_round_trips_through_yaml_and_disk() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("pyproject.toml"), "").expect("write");
    fs::write(tmp.path().join("package.json"), "{}").expect("write");
    fs::create_dir(tmp.path().join("apps")).expect("mkdir");

    let model = discover(tmp.path()).expect("discover");
    let parsed = ProjectModel::from_yaml(&model.to_yaml().expect("yaml")).expect("parse");
    assert_eq!(parsed, model);

    let file = tmp.path().join("project.yml");
    model.save(&file).expect("save");
    assert_eq!(ProjectModel::load(&file).expect("load"), model);
}

#[test]
fn hand_edited_snapshot_without_signals_loads() {
    let model = ProjectModel::from_yaml("root_path: /repo\nrepo_type: single\n").expect("parse");
    assert!(model.languages_detected.is_empty());
    assert_eq!(model.signals, SignalMap::new());
}

#[test]
fn merging_a_delta_returns_a_new_model() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("setup.py"), "").expect("write");
    let model = discover(tmp.path()).expect("discover");

    let mut delta = SignalMap::new();
    delta.extend_group("python", &["setup.py".to_string(), "tox.ini".to_string()]);
    let merged = model.merge_signals(&delta);

    assert_eq!(model.signals.get("python").map(|p| p.len()), Some(1));
    assert_eq!(
        merged.signals.get("python"),
        Some(&["setup.py".to_string(), "tox.ini".to_string()][..])
    );
    merged.check_invariants().expect("invariant holds");
}
