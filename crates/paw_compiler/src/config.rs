//! Compiler configuration.

use std::path::PathBuf;

use crate::manifest::OutputFormat;

/// Inputs and outputs of one compile run.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Schema files or directories; directories are searched recursively
    /// for `.paw` files.
    pub schema_paths: Vec<PathBuf>,
    /// JSON scene document.
    pub scene: Option<PathBuf>,
    /// Root keys replacing the document's own root set when non-empty.
    pub roots: Vec<String>,
    /// Manifest destination. `None` leaves writing to the caller.
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    /// Use the built-in demo schema and scene.
    pub demo: bool,
    /// Number of streaming tiles in the demo scene.
    pub demo_tiles: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            schema_paths: Vec::new(),
            scene: None,
            roots: Vec::new(),
            output: None,
            format: OutputFormat::default(),
            demo: false,
            demo_tiles: 1,
        }
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for the built-in demo scene with `tiles` streaming tiles.
    #[must_use]
    pub fn demo(tiles: usize) -> Self {
        Self {
            demo: true,
            demo_tiles: tiles,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_paths.push(path.into());
        self
    }

    #[must_use]
    pub fn with_scene(mut self, path: impl Into<PathBuf>) -> Self {
        self.scene = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_root(mut self, key: impl Into<String>) -> Self {
        self.roots.push(key.into());
        self
    }

    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_new() {
        let config = CompilerConfig::default();
        assert_eq!(config.demo_tiles, 1);
        assert_eq!(config.demo_tiles, CompilerConfig::new().demo_tiles);
        assert!(!config.demo);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_builders() {
        let config = CompilerConfig::demo(3)
            .with_schema("schema")
            .with_root("game")
            .with_output("out/units.json")
            .with_format(OutputFormat::MessagePack);
        assert!(config.demo);
        assert_eq!(config.demo_tiles, 3);
        assert_eq!(config.schema_paths, [PathBuf::from("schema")]);
        assert_eq!(config.roots, ["game"]);
        assert_eq!(config.output, Some(PathBuf::from("out/units.json")));
        assert_eq!(config.format, OutputFormat::MessagePack);
    }
}
