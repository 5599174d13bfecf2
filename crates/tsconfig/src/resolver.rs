//! tsconfig discovery and `extends` resolution.

use crate::json::read_document;
use crate::{CompilerOptions, ConfigError, ConfigWarning};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

/// Environment variable naming an explicit tsconfig location.
pub const TSCONFIG_PATH_ENV: &str = "TSCONFIG_PATH";

/// Default configuration document name.
pub const TSCONFIG_FILENAME: &str = "tsconfig.json";

/// A fully merged configuration.
#[derive(Debug, Clone)]
pub struct ResolvedTsConfig {
    /// The document resolution started from.
    pub path: Utf8PathBuf,
    /// The merged document, without `extends`.
    pub document: Map<String, Value>,
    /// Merged `compilerOptions` with the forced overrides applied.
    pub compiler_options: CompilerOptions,
    /// Advisories raised while resolving.
    pub warnings: Vec<ConfigWarning>,
}

impl ResolvedTsConfig {
    /// The merged document serialized as compact JSON.
    pub fn document_text(&self) -> String {
        Value::Object(self.document.clone()).to_string()
    }
}

/// Locates and merges a tsconfig document.
#[derive(Debug, Clone)]
pub struct TsConfigResolver {
    /// Directory discovery walks up from.
    start_dir: Utf8PathBuf,
    /// Explicit location, tried before discovery.
    override_path: Option<(Utf8PathBuf, OverrideOrigin)>,
}

/// Where an override location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverrideOrigin {
    Environment,
    Explicit,
}

impl TsConfigResolver {
    /// Creates a resolver that discovers `tsconfig.json` from `start_dir` upwards.
    pub fn new(start_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            start_dir: start_dir.into(),
            override_path: None,
        }
    }

    /// Creates a resolver honoring the `TSCONFIG_PATH` environment variable.
    pub fn from_env(start_dir: impl Into<Utf8PathBuf>) -> Self {
        let resolver = Self::new(start_dir);
        match std::env::var(TSCONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self {
                override_path: Some((path.into(), OverrideOrigin::Environment)),
                ..resolver
            },
            _ => resolver,
        }
    }

    /// Sets an explicit document location.
    pub fn with_override(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.override_path = Some((path.into(), OverrideOrigin::Explicit));
        self
    }

    /// Finds the document, follows its `extends` chain and merges it.
    pub fn resolve(&self) -> Result<ResolvedTsConfig, ConfigError> {
        let path = self.locate()?;
        tracing::debug!(path = %path, "loading tsconfig");

        let mut visiting = Vec::new();
        let document = load_chain(&path, &mut visiting)?;

        let compiler_options = match document.get("compilerOptions") {
            None => CompilerOptions::new(),
            Some(Value::Object(options)) => CompilerOptions::from(options.clone()),
            Some(_) => {
                return Err(ConfigError::Parse {
                    path,
                    message: "`compilerOptions` must be an object".to_string(),
                })
            }
        };

        let warnings = compiler_options.interop_warnings();
        for warning in &warnings {
            tracing::warn!(path = %path, "{warning}");
        }

        Ok(ResolvedTsConfig {
            path,
            document,
            compiler_options: compiler_options.with_forced_overrides(),
            warnings,
        })
    }

    /// Applies the search order: the override, then a walk up from `start_dir`.
    fn locate(&self) -> Result<Utf8PathBuf, ConfigError> {
        if let Some((override_path, origin)) = &self.override_path {
            let resolved = absolutize(override_path);
            if resolved.is_file() {
                return Ok(resolved);
            }
            for line in missing_override_warnings(*origin, override_path, &resolved) {
                tracing::warn!("{line}");
            }
        }

        let start = absolutize(&self.start_dir);
        start
            .ancestors()
            .map(|dir| dir.join(TSCONFIG_FILENAME))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ConfigError::NotFound(start.join(TSCONFIG_FILENAME)))
    }
}

fn missing_override_warnings(
    origin: OverrideOrigin,
    requested: &Utf8Path,
    resolved: &Utf8Path,
) -> Vec<String> {
    let (heading, requested) = match origin {
        OverrideOrigin::Environment => (
            format!("tsconfig file specified by {TSCONFIG_PATH_ENV} environment variable was not found"),
            format!("{TSCONFIG_PATH_ENV} = {requested}"),
        ),
        OverrideOrigin::Explicit => (
            "explicitly specified tsconfig file was not found".to_string(),
            format!("requested = {requested}"),
        ),
    };
    vec![
        heading,
        requested,
        format!("resolved = {resolved}"),
        "looking in project root directory".to_string(),
    ]
}

fn absolutize(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return path.to_owned();
    }
    std::env::current_dir()
        .ok()
        .and_then(|cwd| Utf8PathBuf::try_from(cwd).ok())
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|| path.to_owned())
}

/// Loads `path` and everything it extends, base documents first.
fn load_chain(
    path: &Utf8Path,
    visiting: &mut Vec<Utf8PathBuf>,
) -> Result<Map<String, Value>, ConfigError> {
    let canonical = path.canonicalize_utf8().unwrap_or_else(|_| path.to_owned());
    if visiting.contains(&canonical) {
        return Err(ConfigError::CircularExtends(path.to_owned()));
    }
    visiting.push(canonical);

    let mut document = read_document(path)?;
    let dir = path.parent().unwrap_or(Utf8Path::new("."));

    let mut merged = Map::new();
    match document.remove("extends") {
        None => {}
        Some(Value::String(spec)) => {
            let base = resolve_extends(&spec, dir)?;
            merge_documents(&mut merged, load_chain(&base, visiting)?);
        }
        Some(Value::Array(specs)) => {
            for spec in specs {
                let Value::String(spec) = spec else {
                    return Err(extends_type_error(path));
                };
                let base = resolve_extends(&spec, dir)?;
                merge_documents(&mut merged, load_chain(&base, visiting)?);
            }
        }
        Some(_) => return Err(extends_type_error(path)),
    }
    merge_documents(&mut merged, document);

    visiting.pop();
    Ok(merged)
}

fn extends_type_error(path: &Utf8Path) -> ConfigError {
    ConfigError::Parse {
        path: path.to_owned(),
        message: "`extends` must be a string or an array of strings".to_string(),
    }
}

/// Overlays `derived` onto `base`. `compilerOptions` merge key by key; every
/// other key is replaced wholesale.
fn merge_documents(base: &mut Map<String, Value>, derived: Map<String, Value>) {
    for (key, value) in derived {
        if key == "compilerOptions" {
            if let (Some(Value::Object(base_options)), Value::Object(options)) =
                (base.get_mut(&key), &value)
            {
                for (name, option) in options {
                    base_options.insert(name.clone(), option.clone());
                }
                continue;
            }
        }
        base.insert(key, value);
    }
}

/// Resolves an `extends` specifier relative to the extending document's directory.
fn resolve_extends(spec: &str, dir: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    let is_path = spec.starts_with("./")
        || spec.starts_with("../")
        || Utf8Path::new(spec).is_absolute();

    if is_path {
        let candidate = dir.join(spec);
        return file_or_json(&candidate).ok_or(ConfigError::NotFound(candidate));
    }

    for ancestor in dir.ancestors() {
        let candidate = ancestor.join("node_modules").join(spec);
        if let Some(found) = file_or_json(&candidate) {
            return Ok(found);
        }
        if candidate.is_dir() {
            if let Some(found) = package_tsconfig(&candidate) {
                return Ok(found);
            }
        }
    }

    Err(ConfigError::NotFound(dir.join("node_modules").join(spec)))
}

fn file_or_json(candidate: &Utf8Path) -> Option<Utf8PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_owned());
    }
    let with_extension = Utf8PathBuf::from(format!("{candidate}.json"));
    with_extension.is_file().then_some(with_extension)
}

/// A package directory names its config through `package.json`'s `tsconfig`
/// field, or ships a `tsconfig.json` at its root.
fn package_tsconfig(package_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let manifest = read_document(&package_dir.join("package.json")).ok();
    if let Some(Value::String(field)) = manifest.as_ref().and_then(|m| m.get("tsconfig")) {
        let candidate = package_dir.join(field);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    let candidate = package_dir.join(TSCONFIG_FILENAME);
    candidate.is_file().then_some(candidate)
}
