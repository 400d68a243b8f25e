//! Reader for conda environment spec files (`environment.yml`).
//!
//! Only the parts the installer needs are modelled: the environment name and a
//! count of the declared dependencies for logging. Package-manager semantics of
//! the file stay with conda/mamba.

use pmhc_common::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentFile {
    pub name: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    /// Either plain specs ("python=3.10") or a nested `pip:` list.
    #[serde(default)]
    pub dependencies: Vec<serde_yaml::Value>,
}

impl EnvironmentFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: EnvironmentFile = serde_yaml::from_str(content)?;
        Ok(file)
    }

    /// Number of conda specs plus pip specs.
    pub fn dependency_count(&self) -> usize {
        self.dependencies
            .iter()
            .map(|dep| match dep {
                serde_yaml::Value::Mapping(m) => m
                    .get("pip")
                    .and_then(|p| p.as_sequence())
                    .map(|s| s.len())
                    .unwrap_or(0),
                _ => 1,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
name: pmhc
channels:
  - conda-forge
  - bioconda
dependencies:
  - python=3.10
  - muscle
  - pip
  - pip:
      - biopython
      - pandas
"#;

    #[test]
    fn test_parse_name_and_dependencies() {
        let env = EnvironmentFile::parse(SPEC).unwrap();
        assert_eq!(env.name.as_deref(), Some("pmhc"));
        assert_eq!(env.channels, vec!["conda-forge", "bioconda"]);
        assert_eq!(env.dependency_count(), 5);
    }

    #[test]
    fn test_nameless_spec() {
        let env = EnvironmentFile::parse("dependencies:\n  - python\n").unwrap();
        assert!(env.name.is_none());
        assert_eq!(env.dependency_count(), 1);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(EnvironmentFile::parse("name: [unclosed").is_err());
    }
}
