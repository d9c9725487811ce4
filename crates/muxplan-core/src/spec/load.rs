//! Spec file loading.
//!
//! Files are parsed by extension (`.yaml`/`.yml` as YAML, `.json` as JSON);
//! anything else is tried as YAML first, then JSON. Parsing is followed by
//! structural validation, so a `Spec` obtained from this module is always
//! normalized.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::errors::SpecError;
use super::types::Spec;

/// Candidate project-local spec filenames, probed in order.
pub const DEFAULT_SPEC_FILENAMES: [&str; 3] = [".muxplan.yaml", ".muxplan.yml", ".muxplan.json"];

/// Load and validate a spec from a YAML or JSON file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Spec, SpecError> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(SpecError::EmptyPath);
    }

    info!(event = "core.spec.load_started", path = %path.display());

    let bytes = std::fs::read_to_string(path).map_err(|e| SpecError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut spec: Spec = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&bytes).map_err(|e| SpecError::Parse {
            path: path.to_path_buf(),
            format: "YAML".to_string(),
            message: e.to_string(),
        })?,
        "json" => serde_json::from_str(&bytes).map_err(|e| SpecError::Parse {
            path: path.to_path_buf(),
            format: "JSON".to_string(),
            message: e.to_string(),
        })?,
        _ => match serde_yaml::from_str(&bytes) {
            Ok(spec) => spec,
            Err(yaml_err) => serde_json::from_str(&bytes).map_err(|json_err| SpecError::Parse {
                path: path.to_path_buf(),
                format: "YAML or JSON".to_string(),
                message: format!("yaml: {}; json: {}", yaml_err, json_err),
            })?,
        },
    };

    spec.validate()?;

    info!(
        event = "core.spec.load_completed",
        path = %path.display(),
        windows = spec.windows.len(),
        actions = spec.actions.len()
    );
    Ok(spec)
}

/// Probe a project directory for a spec file using the default filenames.
///
/// Returns `Ok(None)` when no candidate exists. A candidate that exists but
/// fails to parse or validate is an error, not a miss.
pub fn load_project_local(project_dir: impl AsRef<Path>) -> Result<Option<(Spec, PathBuf)>, SpecError> {
    load_project_local_with_names(project_dir, &DEFAULT_SPEC_FILENAMES)
}

/// Probe a project directory for a spec file using custom basenames.
///
/// Names are treated as basenames relative to the directory and tried in
/// order; an empty list falls back to [`DEFAULT_SPEC_FILENAMES`].
pub fn load_project_local_with_names(
    project_dir: impl AsRef<Path>,
    names: &[&str],
) -> Result<Option<(Spec, PathBuf)>, SpecError> {
    let project_dir = project_dir.as_ref();
    if project_dir.as_os_str().is_empty() {
        return Err(SpecError::EmptyPath);
    }

    let defaults = DEFAULT_SPEC_FILENAMES;
    let names: &[&str] = if names.is_empty() { &defaults } else { names };

    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let candidate = project_dir.join(name);
        let Ok(meta) = std::fs::metadata(&candidate) else {
            continue;
        };
        if meta.is_dir() {
            continue;
        }

        debug!(event = "core.spec.project_local_found", path = %candidate.display());
        let spec = load_file(&candidate)?;
        return Ok(Some((spec, candidate)));
    }

    debug!(event = "core.spec.project_local_missing", dir = %project_dir.display());
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MINIMAL_YAML: &str = "version: 1\nwindows:\n  - name: main\n";

    #[test]
    fn test_load_file_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.yaml");
        fs::write(&path, MINIMAL_YAML).unwrap();

        let spec = load_file(&path).unwrap();
        assert_eq!(spec.windows[0].name, "main");
        assert_eq!(spec.version, 1);
    }

    #[test]
    fn test_load_file_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"version": 1, "windows": [{"name": "main"}]}"#).unwrap();

        let spec = load_file(&path).unwrap();
        assert_eq!(spec.windows[0].name, "main");
    }

    #[test]
    fn test_load_file_unknown_extension_tries_yaml_then_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("session.conf");
        fs::write(&yaml_path, MINIMAL_YAML).unwrap();
        assert!(load_file(&yaml_path).is_ok());

        // serde_yaml accepts JSON (it is a YAML subset), so an arbitrary
        // extension with JSON content still loads.
        let json_path = dir.path().join("session.spec");
        fs::write(&json_path, r#"{"version": 1, "windows": [{"name": "x"}]}"#).unwrap();
        assert!(load_file(&json_path).is_ok());
    }

    #[test]
    fn test_load_file_parse_error_names_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "windows: [unclosed\n").unwrap();

        let err = load_file(&path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("as YAML"), "got: {}", msg);
        assert!(msg.contains("broken.yaml"));
    }

    #[test]
    fn test_load_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "version: 1\n").unwrap();

        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains("windows[] or actions[]"));
    }

    #[test]
    fn test_load_file_missing_is_io_error() {
        let err = load_file("/no/such/spec.yaml").unwrap_err();
        assert!(matches!(err, SpecError::Io { .. }));
    }

    #[test]
    fn test_load_project_local_probes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".muxplan.yml"), MINIMAL_YAML).unwrap();
        fs::write(
            dir.path().join(".muxplan.json"),
            r#"{"version": 1, "windows": [{"name": "from-json"}]}"#,
        )
        .unwrap();

        let (spec, path) = load_project_local(dir.path()).unwrap().unwrap();
        // .muxplan.yml comes before .muxplan.json in the probe order.
        assert_eq!(spec.windows[0].name, "main");
        assert!(path.ends_with(".muxplan.yml"));
    }

    #[test]
    fn test_load_project_local_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_project_local(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_project_local_broken_candidate_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".muxplan.yaml"), "version: [[[\n").unwrap();
        assert!(load_project_local(dir.path()).is_err());
    }

    #[test]
    fn test_load_project_local_custom_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("layout.yaml"), MINIMAL_YAML).unwrap();

        let found = load_project_local_with_names(dir.path(), &["layout.yaml"])
            .unwrap()
            .unwrap();
        assert!(found.1.ends_with("layout.yaml"));
    }
}
