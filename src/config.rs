//! Config Loader (C12) — merges constructor arguments, environment variables, and a project-local
//! `.co/config.toml` file into a fully resolved agent configuration.
//!
//! Precedence runs constructor args > env vars > project file > built-in defaults, across the
//! full set of resolvable options (model, system prompt, iteration budget, temperature,
//! credentials). The shape is a plain struct with a `Default` impl, plus a `toml` + `dotenvy`
//! loading layer on top for the file and environment tiers.

use crate::error::ConnectOnionError;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default model selector used when nothing else specifies one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
/// Default per-request sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
/// Default iteration budget for the agent loop.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;
/// Default session token budget, independent of any one provider's context window.
pub const DEFAULT_MAX_TOKENS: usize = 100_000;

/// Caller-supplied overrides — the highest-precedence layer. Every field left `None` falls
/// through to the environment, then the project file, then built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub name: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub max_iterations: Option<u32>,
    pub temperature: Option<f32>,
    pub api_key: Option<String>,
}

/// Fully resolved agent configuration, ready to hand to `Agent::new`.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub name: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_iterations: u32,
    pub temperature: f32,
    pub api_key: Option<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            name: "agent".to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            temperature: DEFAULT_TEMPERATURE,
            api_key: None,
        }
    }
}

/// The subset of `.co/config.toml` this loader understands. Unknown keys are ignored rather than
/// rejected, so a project file can carry unrelated project-layout settings alongside these
/// without tripping parsing.
#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ProjectFile {
    name: Option<String>,
    model: Option<String>,
    system_prompt: Option<String>,
    max_iterations: Option<u32>,
    temperature: Option<f32>,
}

fn load_project_file(project_root: &Path) -> ProjectFile {
    let path = project_root.join(".co").join("config.toml");
    match fs::read_to_string(&path) {
        Ok(raw) => toml::from_str(&raw).unwrap_or_else(|e| {
            if log::log_enabled!(log::Level::Warn) {
                log::warn!("config: failed to parse {}: {}", path.display(), e);
            }
            ProjectFile::default()
        }),
        Err(_) => ProjectFile::default(),
    }
}

/// Resolve `system_prompt`: a literal string, or a path to an existing file whose contents are
/// loaded instead. If `value` names a path that exists on disk, the file contents are loaded;
/// otherwise it's treated as a literal.
pub fn resolve_system_prompt(value: &str) -> String {
    let path = Path::new(value);
    if path.is_file() {
        fs::read_to_string(path).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Merge `overrides` with the environment, `.co/config.toml` under `project_root`, and built-in
/// defaults, in that precedence order. `env_keys` from [`crate::dispatcher`] supplies the
/// provider-credential variable names; `MODEL` is read directly here.
pub fn resolve(overrides: ConfigOverrides, project_root: &Path) -> Result<ResolvedConfig, ConnectOnionError> {
    let file = load_project_file(project_root);
    let defaults = ResolvedConfig::default();

    let model = overrides
        .model
        .or_else(|| env::var("MODEL").ok())
        .or(file.model)
        .unwrap_or(defaults.model);

    let name = overrides.name.or(file.name).unwrap_or(defaults.name);

    let system_prompt = overrides
        .system_prompt
        .or(file.system_prompt)
        .map(|s| resolve_system_prompt(&s));

    let max_iterations = overrides.max_iterations.or(file.max_iterations).unwrap_or(defaults.max_iterations);
    if max_iterations < 1 {
        return Err(ConnectOnionError::InvalidConfig {
            detail: "max_iterations must be >= 1".to_string(),
        });
    }

    let temperature = overrides.temperature.or(file.temperature).unwrap_or(defaults.temperature);

    let api_key = overrides.api_key.or_else(|| {
        crate::dispatcher::env_keys::credential_for_model(&model).and_then(|var| env::var(var).ok())
    });

    Ok(ResolvedConfig { name, model, system_prompt, max_iterations, temperature, api_key })
}

/// Load `.env` from `project_root` into the process environment, best-effort, for local
/// credential loading during development. Never overrides a variable already set in the
/// environment.
pub fn load_dotenv(project_root: &Path) {
    let candidate = project_root.join(".env");
    if candidate.is_file() {
        let _ = dotenvy::from_path(candidate);
    } else {
        let _ = dotenvy::dotenv();
    }
}

/// Convenience entry point for callers that don't care about a non-default project root.
pub fn resolve_in_cwd(overrides: ConfigOverrides) -> Result<ResolvedConfig, ConnectOnionError> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve(overrides, &cwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_when_nothing_else_is_set() {
        let dir = tempdir();
        let resolved = resolve(ConfigOverrides::default(), dir.path()).unwrap();
        assert_eq!(resolved.model, DEFAULT_MODEL);
        assert_eq!(resolved.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn explicit_override_wins_over_project_file() {
        let dir = tempdir();
        write_project_file(&dir, "model = \"gemini-2.0-flash\"\n");
        let overrides = ConfigOverrides { model: Some("claude-sonnet-4-0".to_string()), ..Default::default() };
        let resolved = resolve(overrides, dir.path()).unwrap();
        assert_eq!(resolved.model, "claude-sonnet-4-0");
    }

    #[test]
    fn project_file_wins_over_defaults() {
        let dir = tempdir();
        write_project_file(&dir, "model = \"gemini-2.0-flash\"\nmax_iterations = 4\n");
        let resolved = resolve(ConfigOverrides::default(), dir.path()).unwrap();
        assert_eq!(resolved.model, "gemini-2.0-flash");
        assert_eq!(resolved.max_iterations, 4);
    }

    #[test]
    fn zero_max_iterations_is_invalid() {
        let dir = tempdir();
        let overrides = ConfigOverrides { max_iterations: Some(0), ..Default::default() };
        let err = resolve(overrides, dir.path()).unwrap_err();
        assert!(matches!(err, ConnectOnionError::InvalidConfig { .. }));
    }

    fn tempdir() -> tempfile::TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn write_project_file(dir: &tempfile::TempDir, contents: &str) {
        let co_dir = dir.path().join(".co");
        fs::create_dir_all(&co_dir).unwrap();
        let mut f = fs::File::create(co_dir.join("config.toml")).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }
}
