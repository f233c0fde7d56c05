//! Compiler driver.
//!
//! Ties the stages together: load the schema, build the registry, load the
//! scene, walk it from the root set, partition it, and hand the resulting
//! manifest to the encoder.

use std::path::{Path, PathBuf};

use paw_graph::{ObjectGraph, ObjectId, SceneDocument, Walker};
use paw_schema::{Schema, TypeRegistry};
use tracing::{debug, info, warn};

use crate::config::CompilerConfig;
use crate::demo;
use crate::error::CompileError;
use crate::manifest::{self, UnitManifest};
use crate::partition::{UnitSet, partition};

/// Partitions object graphs against one registry.
#[derive(Debug)]
pub struct Compiler {
    registry: TypeRegistry,
}

impl Compiler {
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Validate `graph`, walk it from `roots` and partition it.
    pub fn compile(&self, graph: &ObjectGraph, roots: &[ObjectId]) -> Result<UnitSet, CompileError> {
        graph.validate(&self.registry)?;
        let walk = Walker::new(&self.registry).walk(graph, roots)?;
        let units = partition(graph, roots, &walk)?;
        info!(
            objects = walk.order.len(),
            edges = walk.edges.len(),
            units = units.len(),
            dependencies = units.dependencies().len(),
            "scene partitioned"
        );
        Ok(units)
    }

    /// Materialize `document` and compile it from its own root set.
    pub fn compile_document(
        &self,
        document: &SceneDocument,
    ) -> Result<(ObjectGraph, UnitSet), CompileError> {
        let (graph, roots) = document.to_graph(&self.registry)?;
        let units = self.compile(&graph, &roots)?;
        Ok((graph, units))
    }
}

/// Outcome of [`run`].
#[derive(Debug)]
pub struct CompileSummary {
    pub manifest: UnitManifest,
    /// The encoded manifest, in the configured format.
    pub bytes: Vec<u8>,
    /// Where the manifest was written, if anywhere.
    pub output: Option<PathBuf>,
}

/// Load the configured schema sources into a registry.
pub fn load_registry(config: &CompilerConfig) -> Result<TypeRegistry, CompileError> {
    let mut schema = Schema::new();
    if config.demo {
        schema.load_source(demo::DEMO_SCHEMA)?;
    }
    for path in &config.schema_paths {
        info!(path = %path.display(), "loading schema");
        if path.is_dir() {
            schema.load_dir(path)?;
        } else {
            schema.load_file(path)?;
        }
    }
    if schema.is_empty() {
        return Err(CompileError::NoSchema);
    }

    let registry = TypeRegistry::build(&schema)?;
    info!(types = registry.len(), "schema loaded");
    Ok(registry)
}

/// Run one full compilation as described by `config`.
///
/// When `config.output` is set the manifest is written to a temporary file
/// next to the destination and renamed into place. A failed run leaves no
/// output file.
pub fn run(config: &CompilerConfig) -> Result<CompileSummary, CompileError> {
    let compiler = Compiler::new(load_registry(config)?);
    let registry = compiler.registry();

    let (graph, mut roots) = if let Some(path) = &config.scene {
        load_scene(path)?.to_graph(registry)?
    } else if config.demo {
        demo::scene(registry, config.demo_tiles)?
    } else {
        return Err(CompileError::NoScene);
    };

    if !config.roots.is_empty() {
        roots = config
            .roots
            .iter()
            .map(|key| {
                graph
                    .find(key)
                    .ok_or_else(|| paw_graph::GraphError::UnknownRoot(key.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
    }
    if roots.is_empty() {
        warn!("root set is empty; no streaming units will be produced");
    }

    let units = compiler.compile(&graph, &roots)?;
    let manifest = UnitManifest::new(&graph, registry, &units);
    let bytes = manifest::encode(&manifest, config.format)?;

    if let Some(path) = &config.output {
        write_atomic(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "manifest written");
    }

    Ok(CompileSummary {
        manifest,
        bytes,
        output: config.output.clone(),
    })
}

fn load_scene(path: &Path) -> Result<SceneDocument, CompileError> {
    info!(path = %path.display(), "loading scene");
    let source = std::fs::read_to_string(path).map_err(io_error(path))?;
    SceneDocument::from_json(&source).map_err(|source| CompileError::Scene {
        path: path.to_path_buf(),
        source,
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CompileError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    debug!(tmp = %tmp.display(), "writing temporary manifest");

    std::fs::write(&tmp, bytes).map_err(io_error(&tmp))?;
    if let Err(source) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(CompileError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CompileError {
    let path = path.to_path_buf();
    move |source| CompileError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use crate::manifest::OutputFormat;
    use crate::partition::UnitId;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("paw-driver-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_seed_scenario() {
        let summary = run(&CompilerConfig::demo(2)).unwrap();
        let manifest = summary.manifest;

        let roots: Vec<_> = manifest.units.iter().map(|u| u.root.as_str()).collect();
        assert_eq!(roots, ["game", "map", "tile_0", "tile_1"]);
        assert_eq!(manifest.unit("game").unwrap().members, ["game"]);
        assert_eq!(manifest.unit("map").unwrap().members, ["map"]);
        for tile in ["tile_0", "tile_1"] {
            let unit = manifest.unit(tile).unwrap();
            assert_eq!(
                unit.members,
                [
                    tile.to_string(),
                    format!("{tile}_entity"),
                    format!("{tile}_transform"),
                    format!("{tile}_component"),
                    format!("{tile}_transform_child"),
                ]
            );
            assert!(unit.dependencies.is_empty());
            assert_eq!(unit.root_type, "streaming_tile");
        }
        assert_eq!(
            manifest.unit("game").unwrap().dependencies,
            [UnitId::from_key("map")]
        );
        assert_eq!(
            manifest.unit("map").unwrap().dependencies,
            [UnitId::from_key("tile_0"), UnitId::from_key("tile_1")]
        );

        // No object is shared between units.
        let mut seen = std::collections::HashSet::new();
        for unit in &manifest.units {
            for member in &unit.members {
                assert!(seen.insert(member.as_str()), "{member} in two units");
            }
        }
        assert_eq!(seen.len(), 2 + 2 * 5);

        assert_eq!(manifest.stages.len(), 3);
        assert_eq!(
            manifest.stages[2],
            [UnitId::from_key("tile_0"), UnitId::from_key("tile_1")]
        );
        assert!(summary.output.is_none());
    }

    #[test]
    fn test_demo_is_deterministic() {
        let config = CompilerConfig::demo(5).with_format(OutputFormat::MessagePack);
        let first = run(&config).unwrap().bytes;
        for _ in 0..3 {
            assert_eq!(run(&config).unwrap().bytes, first);
        }
    }

    #[test]
    fn test_run_writes_manifest() {
        let dir = scratch("write");
        let out = dir.join("out").join("units.msgpack");
        let config = CompilerConfig::demo(2)
            .with_output(&out)
            .with_format(OutputFormat::MessagePack);

        let summary = run(&config).unwrap();
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(bytes, summary.bytes);
        let decoded = manifest::decode(&bytes, OutputFormat::MessagePack).unwrap();
        assert_eq!(decoded.units.len(), 4);
        assert!(!dir.join("out").join(".units.msgpack.tmp").exists());
    }

    #[test]
    fn test_conflict_writes_nothing() {
        let dir = scratch("conflict");
        std::fs::write(
            dir.join("world.paw"),
            r#"
            package test:conflict
            record entity {
                components: list<transform>,
                @streaming streamed: option<transform>,
            }
            record transform {}
            "#,
        )
        .unwrap();
        std::fs::write(
            dir.join("scene.json"),
            r#"{
                "roots": ["e"],
                "objects": [
                    { "key": "e", "type": "entity", "fields": { "components": ["t"], "streamed": "t" } },
                    { "key": "t", "type": "transform" }
                ]
            }"#,
        )
        .unwrap();

        let out = dir.join("units.json");
        let config = CompilerConfig::new()
            .with_schema(&dir)
            .with_scene(dir.join("scene.json"))
            .with_output(&out);
        let err = run(&config).unwrap_err();
        assert!(matches!(err, CompileError::Conflict(ref c) if c.object() == "t"));
        assert!(!out.exists());
    }

    #[test]
    fn test_root_override() {
        let config = CompilerConfig::demo(2).with_root("tile_1");
        let manifest = run(&config).unwrap().manifest;
        assert_eq!(manifest.units.len(), 1);
        assert_eq!(manifest.units[0].root, "tile_1");

        let err = run(&CompilerConfig::demo(1).with_root("missing")).unwrap_err();
        assert!(matches!(err, CompileError::Graph(_)));
    }

    #[test]
    fn test_missing_inputs() {
        assert!(matches!(
            run(&CompilerConfig::new()),
            Err(CompileError::NoSchema)
        ));

        let dir = scratch("missing");
        std::fs::write(dir.join("a.paw"), "package t:a record a {}").unwrap();
        assert!(matches!(
            run(&CompilerConfig::new().with_schema(&dir)),
            Err(CompileError::NoScene)
        ));

        let bad = dir.join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        let err = run(&CompilerConfig::new().with_schema(&dir).with_scene(&bad)).unwrap_err();
        assert!(matches!(err, CompileError::Scene { .. }));
    }

    #[test]
    fn test_compile_document() {
        let compiler = Compiler::new(TypeRegistry::from_source(demo::DEMO_SCHEMA).unwrap());
        let document = SceneDocument::from_json(
            r#"{
                "roots": ["game"],
                "objects": [
                    { "key": "game", "type": "game", "fields": { "main_map": "map" } },
                    { "key": "map", "type": "map", "fields": { "tiles": [] } }
                ]
            }"#,
        )
        .unwrap();
        let (graph, units) = compiler.compile_document(&document).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(units.len(), 2);
        assert_eq!(units.load_stages().len(), 2);
    }
}
