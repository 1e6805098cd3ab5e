//! Tests for error types

use glue_analysis::Error;

#[test]
fn test_schema_error() {
    let error = Error::Schema {
        schema: "CorrelatorData",
        rule: "Check_Internals_equal".to_string(),
        description: "Internal1 and Internal2 hold different labels".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("CorrelatorData"));
    assert!(error_str.contains("Check_Internals_equal"));
    assert!(error_str.contains("different labels"));
}

#[test]
fn test_not_a_table_error() {
    let error = Error::NotATable {
        field: "vevs",
        found: "i64",
    };
    assert_eq!(
        error.to_string(),
        "vevs data is expected to be an Arrow RecordBatch but i64 was found"
    );
}

#[test]
fn test_frozen_error() {
    let error = Error::Frozen { field: "vevs" };
    assert_eq!(
        error.to_string(),
        "This instance is frozen. You are not allowed to modify vevs anymore."
    );
}

#[test]
fn test_data_inconsistency_error() {
    let error = Error::DataInconsistency("group (Time=1, Internal2=2)".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Data inconsistency"));
    assert!(error_str.contains("Internal2=2"));
}

#[test]
fn test_too_few_samples_error() {
    let error = Error::TooFewSamples {
        found: 3,
        required: 5,
    };
    assert_eq!(
        error.to_string(),
        "Samples have to have at least 5 entries, found 3"
    );
}

#[test]
fn test_missing_data_and_not_dense_errors() {
    assert!(Error::MissingData("Vevs is not set for this instance.".to_string())
        .to_string()
        .contains("Vevs is not set"));
    assert!(Error::NotDense("89 rows".to_string())
        .to_string()
        .starts_with("Table is not densely indexed"));
}

#[test]
fn test_metadata_conflict_error() {
    let error = Error::MetadataConflict("NT".to_string());
    assert!(error.to_string().ends_with("NT"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_arrow_error_conversion() {
    let arrow_error = arrow::error::ArrowError::ComputeError("bad cast".to_string());
    let error: Error = arrow_error.into();
    assert!(matches!(error, Error::Arrow(_)));
    assert!(error.to_string().contains("bad cast"));
}
