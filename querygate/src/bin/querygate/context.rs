use anyhow::{Context, Result};
use clap::ValueEnum;
use querygate::{Dialect, QueryValidators, Registry};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Dialect selection on the command line
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq)]
pub enum DialectArg {
    /// Plain grammars: date digit grouping, any number, any string
    Strict,
    /// Operator-prefixed grammars plus text_query, page, count and columns
    #[default]
    Extended,
}

impl From<DialectArg> for Dialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Strict => Dialect::Strict,
            DialectArg::Extended => Dialect::Extended,
        }
    }
}

/// Registry and validator cache shared by all commands
pub struct RegistryContext {
    /// File the registry was read from; `None` for the built-in registry
    pub source: Option<PathBuf>,
    pub validators: QueryValidators,
}

impl RegistryContext {
    /// Load the registry and compile every entity up front, so a broken registry
    /// fails before any command runs.
    pub fn load(path: Option<&Path>, dialect: Dialect) -> Result<Self> {
        let registry = match path {
            Some(path) => Registry::load(path)
                .with_context(|| format!("Failed to load registry from {}", path.display()))?,
            None => Registry::builtin(),
        };

        let validators = QueryValidators::new(Arc::new(registry), dialect);
        validators.warm().context("Registry contains an invalid entity")?;

        Ok(Self {
            source: path.map(Path::to_path_buf),
            validators,
        })
    }

    pub fn registry(&self) -> &Registry {
        self.validators.registry()
    }

    pub fn dialect(&self) -> Dialect {
        self.validators.dialect()
    }

    pub fn source_label(&self) -> String {
        match &self.source {
            Some(path) => path.display().to_string(),
            None => "built-in".to_string(),
        }
    }
}
