use std::path::Path;

use pretty_assertions::assert_eq;

use crate::{ConfigError, IndyConfig, LoggingConfig};

#[test]
fn level_synonyms_and_casing_are_normalized() {
    assert_eq!(LoggingConfig::normalize_level_directives(" WARNING "), "warn");
    assert_eq!(LoggingConfig::normalize_level_directives("Debug"), "debug");
    assert_eq!(LoggingConfig::normalize_level_directives(""), "info");
    assert_eq!(
        LoggingConfig::normalize_level_directives("indy.migrate=trace,info"),
        "indy.migrate=trace,info"
    );
}

#[test]
fn empty_config_uses_defaults() {
    let config = IndyConfig::load_from_str("").unwrap();
    assert_eq!(config, IndyConfig::default());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.batch.include, vec!["**/*.java"]);
    assert_eq!(config.output.indent_width, 4);
}

#[test]
fn partial_tables_keep_the_other_defaults() {
    let config = IndyConfig::load_from_str(
        r#"
[logging]
json = true

[batch]
exclude = ["**/generated/**"]
threads = 3
"#,
    )
    .unwrap();
    assert!(config.logging.json);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.batch.include, vec!["**/*.java"]);
    assert_eq!(config.batch.exclude, vec!["**/generated/**"]);
    assert_eq!(config.batch.effective_threads(), 3);
}

#[test]
fn unknown_keys_are_rejected() {
    let err = IndyConfig::load_from_str("[output]\nindent = 2\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(ref message) if message.contains("indent")));
}

#[test]
fn indent_width_is_bounded() {
    let err = IndyConfig::load_from_str("[output]\nindent_width = 0\n").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            key: "output.indent_width",
            ..
        }
    ));
    assert!(IndyConfig::load_from_str("[output]\nindent_width = 2\n").is_ok());
}

#[test]
fn broken_globs_are_reported_with_their_pattern() {
    let err = IndyConfig::load_from_str("[batch]\ninclude = [\"src/[\"]\n").unwrap_err();
    assert!(matches!(err, ConfigError::Glob { ref pattern, .. } if pattern == "src/["));
}

#[test]
fn exclude_globs_win_over_include() {
    let config = IndyConfig::load_from_str(
        r#"
[batch]
include = ["src/**/*.java"]
exclude = ["**/generated/**"]
"#,
    )
    .unwrap();
    let filter = config.batch.file_filter().unwrap();
    assert!(filter.matches(Path::new("src/main/java/demo/Advice.java")));
    assert!(!filter.matches(Path::new("src/generated/demo/Advice.java")));
    assert!(!filter.matches(Path::new("test/demo/Advice.java")));
    assert!(!filter.matches(Path::new("src/main/java/demo/notes.txt")));
}

#[test]
fn zero_threads_means_one_per_cpu() {
    let config = IndyConfig::default();
    assert!(config.batch.effective_threads() >= 1);
}
