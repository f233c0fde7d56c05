//! Built-in demo world.
//!
//! A game owns a streamed map, the map streams a list of tiles, and each
//! tile owns entities whose components include nested transforms. Compiling
//! it yields one unit for the game, one for the map and one per tile.

use glam::Vec3;
use paw_graph::{GraphError, ObjectGraph, ObjectId, Value};
use paw_schema::TypeRegistry;

pub const DEMO_SCHEMA: &str = r#"
package paw:demo@0.1.0

primitive float3 { x: f32, y: f32, z: f32 }

record game {
    @streaming main_map: map,
}

record map {
    @streaming tiles: list<streaming_tile>,
}

record streaming_tile {
    position: float3,
    entities: list<entity>,
}

record entity {
    components: list<component>,
}

record component {}

record transform_component : component {
    position: float3,
    children: list<transform_component>,
}
"#;

/// Spacing between neighbouring tiles along the x axis.
const TILE_SPACING: f32 = 10.0;

/// Build the demo scene and its root set.
///
/// Tile `i` sits at `(10 * (i + 1), 0, 0)` and holds one entity whose
/// components are a transform with one child transform and a plain base
/// component.
pub fn scene(
    registry: &TypeRegistry,
    tiles: usize,
) -> Result<(ObjectGraph, Vec<ObjectId>), GraphError> {
    let ty = |name: &str| {
        registry.key_of(name).ok_or_else(|| GraphError::UnknownType {
            object: name.to_string(),
            ty: name.to_string(),
        })
    };

    let mut graph = ObjectGraph::new();
    let game = graph.add("game", ty("game")?)?;
    let map = graph.add("map", ty("map")?)?;
    graph.set(game, "main_map", map)?;

    let mut tile_ids = Vec::with_capacity(tiles);
    for i in 0..tiles {
        let tile = graph.add(format!("tile_{i}"), ty("streaming_tile")?)?;
        let entity = graph.add(format!("tile_{i}_entity"), ty("entity")?)?;
        let transform = graph.add(format!("tile_{i}_transform"), ty("transform_component")?)?;
        let child = graph.add(format!("tile_{i}_transform_child"), ty("transform_component")?)?;
        let component = graph.add(format!("tile_{i}_component"), ty("component")?)?;

        let origin = Vec3::X * TILE_SPACING * (i as f32 + 1.0);
        graph.set(tile, "position", float3(origin))?;
        graph.set(tile, "entities", vec![entity])?;
        graph.set(entity, "components", vec![transform, component])?;
        graph.set(transform, "position", float3(Vec3::new(0.0, 1.0, 2.0)))?;
        graph.set(transform, "children", vec![child])?;
        graph.set(child, "position", float3(Vec3::new(4.0, 0.0, 0.0)))?;
        tile_ids.push(tile);
    }
    graph.set(map, "tiles", tile_ids)?;

    Ok((graph, vec![game]))
}

fn float3(v: Vec3) -> Value {
    Value::Scalar(serde_json::json!({ "x": v.x, "y": v.y, "z": v.z }))
}
