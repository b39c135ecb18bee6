//! End-to-end analyses of the online shop model
//!
//! Only built with the `python` feature. They need a CPython interpreter
//! with flamapy installed and share one interpreter per process:
//! ```
//! cargo test -p flamapy-bridge --features python -- --test-threads=1
//! ```
#![cfg(feature = "python")]

use std::path::PathBuf;

use serde_json::{json, Value};

use flamapy_bridge::{FeatureModel, FlamapyError, Operation, Options, Technique};
use flamapy_embed::PythonEngine;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

async fn onlineshop() -> FeatureModel<PythonEngine> {
    let fm = FeatureModel::from_file(fixture("onlineshop.uvl"), Options::default()).unwrap();
    fm.initialize().await.unwrap();
    fm
}

fn sorted_groups(value: Value) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = serde_json::from_value(value).unwrap();
    for group in &mut groups {
        group.sort();
    }
    groups.sort();
    groups
}

#[tokio::test]
async fn test_atomic_sets() {
    let groups = sorted_groups(onlineshop().await.atomic_sets().await.unwrap());

    assert_eq!(groups.len(), 11);
    assert!(groups.contains(&vec![
        "Catalog".to_string(),
        "Onlineshop".to_string(),
        "Payment".to_string(),
        "Product Selection".to_string(),
    ]));
    assert_eq!(groups.iter().filter(|g| g.len() == 1).count(), 10);
}

#[tokio::test]
async fn test_metrics() {
    let fm = onlineshop().await;

    assert_eq!(fm.average_branching_factor().await.unwrap(), json!(2.6));
    assert_eq!(fm.count_leafs().await.unwrap(), json!(9));
    assert_eq!(fm.max_depth().await.unwrap(), json!(3));
    assert_eq!(fm.estimated_number_of_configurations().await.unwrap(), json!(256));
}

#[tokio::test]
async fn test_configurations_number_agrees_across_techniques() {
    let fm = onlineshop().await;

    assert_eq!(fm.configurations_number(Technique::Basic).await.unwrap(), json!(80));
    assert_eq!(fm.configurations_number(Technique::Bdd).await.unwrap(), json!(80));
}

#[tokio::test]
async fn test_configurations_are_decoded() {
    let fm = onlineshop().await;

    let configurations = fm.configurations(Technique::Bdd).await.unwrap();
    let configurations = configurations.as_array().unwrap();
    assert_eq!(configurations.len(), 80);
    assert!(configurations.iter().all(|c| c.is_object()));
}

#[tokio::test]
async fn test_satisfiable_under_every_technique() {
    let fm = onlineshop().await;

    for technique in [Technique::Basic, Technique::Pysat, Technique::Bdd] {
        assert_eq!(fm.satisfiable(technique).await.unwrap(), json!(true), "{}", technique);
    }
}

#[tokio::test]
async fn test_feature_sets() {
    let fm = onlineshop().await;

    assert_eq!(
        fm.core_features(Technique::Basic).await.unwrap(),
        json!(["Onlineshop", "Payment", "Product Selection", "Catalog"])
    );
    assert_eq!(fm.dead_features(Technique::Basic).await.unwrap(), json!([]));
    assert_eq!(fm.leaf_features().await.unwrap().as_array().unwrap().len(), 9);
    assert_eq!(fm.unique_features().await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_feature_ancestors() {
    let fm = onlineshop().await;

    assert_eq!(
        fm.feature_ancestors("Security").await.unwrap(),
        json!(["UserManagement", "Onlineshop"])
    );

    let err = fm.feature_ancestors("Sea").await.unwrap_err();
    assert!(matches!(
        err,
        FlamapyError::Engine {
            operation: Operation::FeatureAncestors,
            ..
        }
    ));
}

#[tokio::test]
async fn test_invalid_configuration_is_not_satisfiable() {
    let fm = onlineshop().await;
    let config = fixture("invalid.csvconf");
    let config = config.to_str().unwrap();

    assert_eq!(fm.satisfiable_configuration(config, false).await.unwrap(), json!(false));
    assert_eq!(fm.satisfiable_configuration(config, true).await.unwrap(), json!(false));
}

#[tokio::test]
async fn test_flag_type_checked_before_engine() {
    let fm = onlineshop().await;
    let config = fixture("invalid.csvconf");

    for bad in [json!(0), json!("")] {
        let err = fm
            .run(
                Operation::SatisfiableConfiguration,
                Technique::Basic,
                vec![json!(config.to_str().unwrap()), bad],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlamapyError::InvalidParameter { expected: "boolean", .. }));
    }
}
