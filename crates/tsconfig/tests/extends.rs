//! Integration tests for tsconfig discovery and `extends` chains.

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;
use std::fs;
use tempfile::TempDir;
use tsconfig::{ConfigError, ConfigWarning, TsConfigResolver, TSCONFIG_PATH_ENV};

struct Fixture {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        Self { _dir: dir, root }
    }

    fn write(&self, relative: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// The three-level relative chain: recursive -> file -> no extends.
    fn relative_chain(&self) {
        self.write(
            "configs/tsconfigNoExtends.json",
            r#"{
                // base of every chain
                "compilerOptions": {
                    "tsconfigNoExtends": true,
                    "overrideMe": "tsconfigNoExtends"
                }
            }"#,
        );
        self.write(
            "configs/tsconfigExtendsFile.json",
            r#"{
                "extends": "./tsconfigNoExtends.json",
                "compilerOptions": {
                    "tsconfigExtendsFile": true,
                    "overrideMe": "tsconfigExtendsFile",
                },
            }"#,
        );
        self.write(
            "configs/tsconfigExtendsFileRecursive.json",
            r#"{
                "extends": "./tsconfigExtendsFile",
                "compilerOptions": {
                    "tsconfigExtendsFileRecursive": true,
                    "overrideMe": "tsconfigExtendsFileRecursive"
                }
            }"#,
        );
    }

    fn resolve(&self, config: &str) -> tsconfig::ResolvedTsConfig {
        TsConfigResolver::new(&self.root)
            .with_override(self.root.join(config))
            .resolve()
            .unwrap()
    }
}

#[test]
fn test_config_without_extends() {
    let fixture = Fixture::new();
    fixture.relative_chain();
    let config = fixture.resolve("configs/tsconfigNoExtends.json");

    assert_eq!(config.compiler_options.get_bool("tsconfigNoExtends"), Some(true));
    assert_eq!(
        config.compiler_options.get("overrideMe"),
        Some(&json!("tsconfigNoExtends"))
    );
}

#[test]
fn test_extends_relative_file() {
    let fixture = Fixture::new();
    fixture.relative_chain();
    let config = fixture.resolve("configs/tsconfigExtendsFile.json");

    assert_eq!(config.compiler_options.get_bool("tsconfigExtendsFile"), Some(true));
    assert_eq!(config.compiler_options.get_bool("tsconfigNoExtends"), Some(true));
    assert_eq!(
        config.compiler_options.get("overrideMe"),
        Some(&json!("tsconfigExtendsFile"))
    );
    assert!(config.document.get("extends").is_none());
}

#[test]
fn test_extends_chain_nearest_layer_wins() {
    let fixture = Fixture::new();
    fixture.relative_chain();
    let config = fixture.resolve("configs/tsconfigExtendsFileRecursive.json");

    let options = &config.compiler_options;
    assert_eq!(options.get_bool("tsconfigExtendsFileRecursive"), Some(true));
    assert_eq!(options.get_bool("tsconfigExtendsFile"), Some(true));
    assert_eq!(options.get_bool("tsconfigNoExtends"), Some(true));
    assert_eq!(
        options.get("overrideMe"),
        Some(&json!("tsconfigExtendsFileRecursive"))
    );
}

fn install_module_configs(fixture: &Fixture) {
    fixture.write(
        "node_modules/base-config/tsconfig.json",
        r#"{ "compilerOptions": { "jsx": "preserve", "moduleResolution": "node" } }"#,
    );
    fixture.write(
        "node_modules/strict-config/package.json",
        r#"{ "name": "strict-config", "tsconfig": "./config/strict.json" }"#,
    );
    fixture.write(
        "node_modules/strict-config/config/strict.json",
        r#"{ "extends": "base-config", "compilerOptions": { "strict": true } }"#,
    );
}

#[test]
fn test_extends_module() {
    let fixture = Fixture::new();
    install_module_configs(&fixture);
    fixture.write(
        "app/tsconfigExtendsModule.json",
        r#"{
            "extends": "strict-config",
            "compilerOptions": { "tsconfigExtendsModule": true, "moduleResolution": "ES6" }
        }"#,
    );
    let config = fixture.resolve("app/tsconfigExtendsModule.json");

    let options = &config.compiler_options;
    assert_eq!(options.get_bool("tsconfigExtendsModule"), Some(true));
    assert_eq!(options.get_bool("strict"), Some(true));
    assert_eq!(options.get("jsx"), Some(&json!("preserve")));
    assert_eq!(options.get("moduleResolution"), Some(&json!("ES6")));
}

#[test]
fn test_extends_module_file_path() {
    let fixture = Fixture::new();
    install_module_configs(&fixture);
    fixture.write(
        "tsconfig.json",
        r#"{ "extends": "base-config/tsconfig.json" }"#,
    );
    let config = fixture.resolve("tsconfig.json");
    assert_eq!(config.compiler_options.get("jsx"), Some(&json!("preserve")));
}

#[test]
fn test_extends_array_later_entries_win() {
    let fixture = Fixture::new();
    fixture.write("a.json", r#"{ "compilerOptions": { "x": "a", "onlyA": true } }"#);
    fixture.write("b.json", r#"{ "compilerOptions": { "x": "b" } }"#);
    fixture.write("tsconfig.json", r#"{ "extends": ["./a.json", "./b.json"] }"#);
    let config = fixture.resolve("tsconfig.json");

    assert_eq!(config.compiler_options.get("x"), Some(&json!("b")));
    assert_eq!(config.compiler_options.get_bool("onlyA"), Some(true));
}

#[test]
fn test_forced_overrides_applied_after_merge() {
    let fixture = Fixture::new();
    fixture.write(
        "tsconfig.json",
        r#"{ "compilerOptions": { "sourceMap": false, "inlineSourceMap": true } }"#,
    );
    let config = fixture.resolve("tsconfig.json");

    assert_eq!(config.compiler_options.get_bool("sourceMap"), Some(true));
    assert_eq!(config.compiler_options.get_bool("inlineSources"), Some(true));
    assert_eq!(config.compiler_options.get("inlineSourceMap"), None);
    // The merged document itself is left as written
    assert_eq!(config.document["compilerOptions"]["sourceMap"], json!(false));
}

#[test]
fn test_interop_warning_is_advisory() {
    let fixture = Fixture::new();
    fixture.write(
        "tsconfig.json",
        r#"{ "compilerOptions": { "allowSyntheticDefaultImports": true } }"#,
    );
    let config = fixture.resolve("tsconfig.json");
    assert_eq!(
        config.warnings,
        vec![ConfigWarning::SyntheticDefaultsWithoutInterop]
    );
}

#[test]
fn test_discovery_walks_up() {
    let fixture = Fixture::new();
    fixture.write("tsconfig.json", r#"{ "compilerOptions": { "found": true } }"#);
    fs::create_dir_all(fixture.root.join("src/components")).unwrap();

    let config = TsConfigResolver::new(fixture.root.join("src/components"))
        .resolve()
        .unwrap();
    assert_eq!(config.path, fixture.root.join("tsconfig.json"));
    assert_eq!(config.compiler_options.get_bool("found"), Some(true));
}

#[test]
fn test_missing_override_falls_back_to_discovery() {
    let fixture = Fixture::new();
    fixture.write("tsconfig.json", "{}");

    let config = TsConfigResolver::new(&fixture.root)
        .with_override(fixture.root.join("missing.json"))
        .resolve()
        .unwrap();
    assert_eq!(config.path, fixture.root.join("tsconfig.json"));
}

#[test]
fn test_not_found() {
    let fixture = Fixture::new();
    let err = TsConfigResolver::new(&fixture.root)
        .resolve()
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(path) if path.ends_with("tsconfig.json")));
}

#[test]
fn test_missing_extends_target() {
    let fixture = Fixture::new();
    fixture.write("tsconfig.json", r#"{ "extends": "./nope.json" }"#);
    let err = TsConfigResolver::new(&fixture.root)
        .with_override(fixture.root.join("tsconfig.json"))
        .resolve()
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(path) if path.ends_with("nope.json")));
}

#[test]
fn test_circular_extends() {
    let fixture = Fixture::new();
    fixture.write("a.json", r#"{ "extends": "./b.json" }"#);
    fixture.write("b.json", r#"{ "extends": "./a.json" }"#);
    let err = TsConfigResolver::new(&fixture.root)
        .with_override(fixture.root.join("a.json"))
        .resolve()
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, ConfigError::CircularExtends(_)));
}

#[test]
fn test_parse_error_names_the_file() {
    let fixture = Fixture::new();
    let path = fixture.write("tsconfig.json", r#"{ "compilerOptions": { "jsx": } }"#);
    let err = TsConfigResolver::new(&fixture.root)
        .with_override(&path)
        .resolve()
        .map(|_| ())
        .unwrap_err();
    assert!(err
        .to_string()
        .starts_with(&format!("Error reading \"{path}\":\n  ")));
}

#[test]
#[serial]
fn test_env_override() {
    let fixture = Fixture::new();
    fixture.relative_chain();
    std::env::set_var(
        TSCONFIG_PATH_ENV,
        fixture.root.join("configs/tsconfigExtendsFile.json"),
    );

    let config = TsConfigResolver::from_env(&fixture.root).resolve();
    std::env::remove_var(TSCONFIG_PATH_ENV);

    let config = config.unwrap();
    assert_eq!(
        config.compiler_options.get("overrideMe"),
        Some(&json!("tsconfigExtendsFile"))
    );
}
