//! Configuration file tests
//!
//! Session policies loaded from a TOML file take effect in the orchestrator.

use std::sync::Arc;

use ferro_locus::config::LocusConfig;
use ferro_locus::session::{LocusStatus, Orchestrator};
use ferro_locus::sources::{MockCall, MockSources, Sources};
use ferro_locus::{Gene, LocusError};

fn brca1() -> Gene {
    Gene {
        symbol: "BRCA1".to_string(),
        name: "BRCA1 DNA repair associated".to_string(),
        chrom: "chr17".to_string(),
        description: String::new(),
        gene_id: Some("672".to_string()),
    }
}

#[tokio::test]
async fn test_window_limits_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ferro-locus.toml");
    std::fs::write(
        &path,
        r#"
[session]
max_window = 500
default_window = 200
"#,
    )
    .unwrap();

    let config = LocusConfig::load(Some(&path)).unwrap();
    let mock = Arc::new(MockSources::with_test_data());
    let orch = Orchestrator::new(Sources::uniform(mock.clone()), &config);

    let view = orch.select_gene(brca1()).await;
    assert_eq!(view.status, LocusStatus::LocusReady);
    assert_eq!(view.sequence.window.unwrap().sequence.len(), 201);

    let view = orch.load_window("43044295", "43044795").await;
    assert_eq!(view.sequence.window.unwrap().sequence.len(), 501);

    let view = orch.load_window("43044295", "43044796").await;
    assert!(view.sequence.error.unwrap().contains("500 bp"));
    assert_eq!(mock.calls(MockCall::FetchSequence), 2);
}

#[test]
fn test_sample_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.toml");
    LocusConfig::default().to_file(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[session]"));
    assert!(content.contains("default_assembly = \"hg38\""));

    assert_eq!(LocusConfig::load(Some(&path)).unwrap(), LocusConfig::default());
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[http]\ntimeout_seconds = 0\n").unwrap();

    let err = LocusConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, LocusError::Config { .. }));
    assert!(err.to_string().contains("timeout_seconds"));
}
