//! Integration tests for config loading from fixture files.
//!
//! These tests verify that the sample config file parses into the `[mangasort]` settings.

use std::fs;
use std::path::{Path, PathBuf};

use manga_organizer::organize::{MangaSortConfig, ResolverMode, TitleParser};

/// Read the sample config file content.
fn read_sample_config() -> String {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    fs::read_to_string(config_path).expect("Failed to read sample config file")
}

#[test]
fn sample_config_file_exists() {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    assert!(config_path.exists(), "Sample config file should exist");
}

#[test]
fn sample_config_is_valid_toml() {
    let config_content = read_sample_config();
    let result: Result<toml::Value, _> = toml::from_str(&config_content);
    assert!(result.is_ok(), "Sample config should be valid TOML: {:?}", result.err());
}

#[test]
fn sample_config_has_mangasort_section() {
    let config_content = read_sample_config();
    let value: toml::Value = toml::from_str(&config_content).expect("should parse");
    let table = value.as_table().expect("should be a table");
    assert!(table.contains_key("mangasort"), "Config should have [mangasort] section");
}

#[test]
fn sample_config_parses_into_settings() {
    let config = MangaSortConfig::from_toml_str(&read_sample_config()).expect("should parse");

    assert_eq!(config.source_directory, Some(PathBuf::from("~/Downloads/manga")));
    assert_eq!(config.destination_directory, Some(PathBuf::from("~/Manga")));
    assert_eq!(config.extensions, vec!["zip", "cbz"]);
    assert!(config.include.is_empty());
    assert_eq!(config.exclude, vec!["sample"]);
    assert_eq!(config.min_score, Some(0.6));
    assert_eq!(config.auto_score, Some(0.9));
    assert_eq!(config.min_partial_chars, Some(2));
    assert_eq!(config.resolver, Some(ResolverMode::Prompt));
    assert!(config.recurse);
    assert!(config.log);
    assert!(!config.keep_names);
    assert!(!config.dryrun);
}

#[test]
fn sample_config_patterns_compile() {
    let config = MangaSortConfig::from_toml_str(&read_sample_config()).expect("should parse");
    let parser = TitleParser::new(config.folder_prefix_pattern.as_deref(), config.volume_pattern.as_deref())
        .expect("patterns should compile");

    assert_eq!(parser.folder_title("あ) [作者x作者2] てすとフォルダ1"), "てすとフォルダ1");
    assert_eq!(
        parser.split_archive_stem("てすと第1巻"),
        ("てすと".to_string(), "第1巻".to_string())
    );
    assert_eq!(
        parser.split_archive_stem("Naruto_v01"),
        ("Naruto".to_string(), "_v01".to_string())
    );
}

#[test]
fn empty_config_uses_defaults() {
    let config = MangaSortConfig::from_toml_str("").expect("should parse empty config");
    assert!(config.destination_directory.is_none());
    assert!(config.extensions.is_empty());
    assert!(config.resolver.is_none());
    assert!(!config.trash_duplicates);
}

#[test]
fn other_sections_are_ignored() {
    let toml = r#"
[reader]
extensions = ["epub"]

[mangasort]
keep_names = true
"#;
    let config = MangaSortConfig::from_toml_str(toml).expect("should parse");
    assert!(config.keep_names);
    assert!(config.extensions.is_empty());
}

#[test]
fn unknown_resolver_is_rejected() {
    let toml = r#"
[mangasort]
resolver = "random"
"#;
    assert!(MangaSortConfig::from_toml_str(toml).is_err());
}

#[test]
fn wrong_value_type_is_rejected() {
    let toml = r#"
[mangasort]
min_score = "high"
"#;
    assert!(MangaSortConfig::from_toml_str(toml).is_err());
}
