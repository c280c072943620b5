//! Integration coverage for the node's config and identity surfaces, the
//! parts of startup that touch the filesystem.

use cluster_membership::NetworkId;
use validator_node::config::ValidatorConfig;
use validator_node::identity::Identity;

#[test]
fn loading_a_toml_file_overrides_the_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("validator.toml");
    let mut config = ValidatorConfig::default();
    config.network_id = NetworkId::Testnet;
    config.banking.parallel_stages = 8;
    std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

    let loaded = ValidatorConfig::load(&path).unwrap();
    assert_eq!(loaded.network_id, NetworkId::Testnet);
    assert_eq!(loaded.banking.parallel_stages, 8);
}

#[test]
fn identity_persists_across_process_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.key");

    let first = Identity::load_or_generate(&path).unwrap();
    drop(first.keypair);

    let second = Identity::load_or_generate(&path).unwrap();
    assert!(second.node_id.starts_with("node_"));
}
