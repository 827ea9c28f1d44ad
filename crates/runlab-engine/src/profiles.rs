//! Per-language build/run recipes and the registry that owns them.
//!
//! A profile describes everything a backend needs to run one language: the
//! sandbox image, an optional compile command, the run command, the file name
//! the source must be written to, the wall-clock timeout covering compile and
//! run together, and the resource ceilings applied by the sandbox.
//!
//! Commands are written relative to the working directory, so a single
//! profile drives both backends: the sandbox bind-mounts the staging
//! directory at [`WORK_DIR`] and makes it the container working directory,
//! while the direct backend makes the staging directory the process cwd.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::errors::EngineError;

/// Fixed working directory inside sandbox containers.
pub const WORK_DIR: &str = "/app";

pub const DEFAULT_MEMORY_LIMIT_BYTES: i64 = 100 * 1024 * 1024;
pub const DEFAULT_CPU_SHARE_WEIGHT: i64 = 512;

/// Immutable build/run recipe for one language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    /// Container image used by the sandboxed backend only.
    pub image: String,
    /// Compile step; absent for interpreted languages. A non-zero compile
    /// exit terminates the pipeline before the run step.
    pub compile_cmd: Option<Vec<String>>,
    /// Run step, executed relative to the working directory.
    pub run_cmd: Vec<String>,
    /// File name the source must be written to. Java in particular requires
    /// the file name to match the public class name.
    pub source_file_name: String,
    /// Wall-clock budget shared by compile and run.
    pub timeout: Duration,
    /// Memory ceiling, enforced by the sandboxed backend only.
    pub memory_limit_bytes: i64,
    /// Relative CPU weight, enforced by the sandboxed backend only.
    pub cpu_share_weight: i64,
}

/// Read-only table of language profiles, constructed once at startup and
/// shared by reference with both backends.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    profiles: HashMap<String, LanguageProfile>,
}

impl LanguageRegistry {
    /// The built-in language set with default resource ceilings.
    pub fn builtin() -> Self {
        Self::builtin_with_limits(DEFAULT_MEMORY_LIMIT_BYTES, DEFAULT_CPU_SHARE_WEIGHT)
    }

    /// Built-in profiles with ceilings from the engine configuration, plus
    /// any per-language timeout overrides.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry =
            Self::builtin_with_limits(config.memory_limit_bytes, config.cpu_share_weight);
        for (language, secs) in &config.timeout_overrides_secs {
            let key = canonical(language);
            match registry.profiles.get_mut(&key) {
                Some(profile) => profile.timeout = Duration::from_secs(*secs),
                None => log::warn!(
                    "ignoring timeout override for unknown language '{}'",
                    language
                ),
            }
        }
        registry
    }

    /// A registry over an arbitrary profile set. Keys are canonicalized on
    /// insertion so lookups behave the same as for the built-in table.
    pub fn with_profiles(profiles: HashMap<String, LanguageProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|(language, profile)| (canonical(&language), profile))
                .collect(),
        }
    }

    fn builtin_with_limits(memory_limit_bytes: i64, cpu_share_weight: i64) -> Self {
        let profile = |image: &str,
                       compile_cmd: Option<&[&str]>,
                       run_cmd: &[&str],
                       source_file_name: &str,
                       timeout_secs: u64| LanguageProfile {
            image: image.to_string(),
            compile_cmd: compile_cmd.map(|cmd| cmd.iter().map(|s| s.to_string()).collect()),
            run_cmd: run_cmd.iter().map(|s| s.to_string()).collect(),
            source_file_name: source_file_name.to_string(),
            timeout: Duration::from_secs(timeout_secs),
            memory_limit_bytes,
            cpu_share_weight,
        };

        let mut profiles = HashMap::new();
        profiles.insert(
            "python".to_string(),
            profile("python:3.9-alpine", None, &["python", "code.py"], "code.py", 10),
        );
        profiles.insert(
            "javascript".to_string(),
            profile("node:18-alpine", None, &["node", "code.js"], "code.js", 10),
        );
        profiles.insert(
            "java".to_string(),
            profile(
                "openjdk:17-alpine",
                Some(&["javac", "Main.java"]),
                &["java", "Main"],
                "Main.java",
                15,
            ),
        );
        profiles.insert(
            "cpp".to_string(),
            profile(
                "gcc:latest",
                Some(&["g++", "-o", "code", "code.cpp"]),
                &["./code"],
                "code.cpp",
                15,
            ),
        );
        profiles.insert(
            "go".to_string(),
            profile("golang:1.19-alpine", None, &["go", "run", "code.go"], "code.go", 10),
        );

        Self { profiles }
    }

    /// Resolve a language identifier to its profile. Matching is exact on
    /// the canonicalized identifier; unknown identifiers are a hard
    /// rejection, never a default profile.
    pub fn lookup(&self, language: &str) -> Result<&LanguageProfile, EngineError> {
        self.profiles
            .get(&canonical(language))
            .ok_or_else(|| EngineError::UnsupportedLanguage(language.to_string()))
    }

    /// Canonical identifiers of every supported language.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

/// Lower-case the identifier and fold common aliases onto canonical names.
fn canonical(language: &str) -> String {
    let lower = language.trim().to_lowercase();
    match lower.as_str() {
        "python3" => "python".to_string(),
        "node" | "nodejs" => "javascript".to_string(),
        "c++" => "cpp".to_string(),
        _ => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(registry.lookup("Python").unwrap().image, "python:3.9-alpine");
        assert_eq!(registry.lookup("PYTHON").unwrap().image, "python:3.9-alpine");
    }

    #[test]
    fn aliases_map_to_canonical_profiles() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(registry.lookup("python3").unwrap().image, "python:3.9-alpine");
        assert_eq!(registry.lookup("node").unwrap().image, "node:18-alpine");
        assert_eq!(registry.lookup("nodejs").unwrap().image, "node:18-alpine");
        assert_eq!(registry.lookup("C++").unwrap().image, "gcc:latest");
    }

    #[test]
    fn unknown_language_is_rejected() {
        let registry = LanguageRegistry::builtin();
        let err = registry.lookup("brainfuck").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedLanguage(ref l) if l == "brainfuck"));
    }

    #[test]
    fn compiled_languages_carry_a_compile_step() {
        let registry = LanguageRegistry::builtin();
        assert!(registry.lookup("java").unwrap().compile_cmd.is_some());
        assert!(registry.lookup("cpp").unwrap().compile_cmd.is_some());
        assert!(registry.lookup("python").unwrap().compile_cmd.is_none());
        assert!(registry.lookup("javascript").unwrap().compile_cmd.is_none());
        assert!(registry.lookup("go").unwrap().compile_cmd.is_none());
    }

    #[test]
    fn timeouts_follow_interpreted_vs_compiled_defaults() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(registry.lookup("python").unwrap().timeout, Duration::from_secs(10));
        assert_eq!(registry.lookup("cpp").unwrap().timeout, Duration::from_secs(15));
        assert_eq!(registry.lookup("java").unwrap().timeout, Duration::from_secs(15));
    }

    #[test]
    fn config_overrides_apply_to_limits_and_timeouts() {
        let mut config = EngineConfig::default();
        config.memory_limit_bytes = 64 * 1024 * 1024;
        config.cpu_share_weight = 256;
        config.timeout_overrides_secs.insert("Python".to_string(), 30);
        config.timeout_overrides_secs.insert("fortran".to_string(), 30);

        let registry = LanguageRegistry::from_config(&config);
        let python = registry.lookup("python").unwrap();
        assert_eq!(python.memory_limit_bytes, 64 * 1024 * 1024);
        assert_eq!(python.cpu_share_weight, 256);
        assert_eq!(python.timeout, Duration::from_secs(30));
        // Untouched languages keep their defaults.
        assert_eq!(registry.lookup("cpp").unwrap().timeout, Duration::from_secs(15));
    }

    #[test]
    fn java_source_file_matches_the_main_class() {
        let registry = LanguageRegistry::builtin();
        assert_eq!(registry.lookup("java").unwrap().source_file_name, "Main.java");
    }
}
