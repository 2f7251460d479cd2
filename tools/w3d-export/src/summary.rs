//! Human-readable scene summaries for `inspect`

use w3d_common::chunk::tag_label;
use w3d_common::{Animation, Scene};

/// One line per scene part
pub fn describe(scene: &Scene) -> Vec<String> {
    let mut lines = Vec::new();

    match &scene.hierarchy {
        Some(hierarchy) => {
            lines.push(format!(
                "Hierarchy '{}': {} pivots",
                hierarchy.name,
                hierarchy.pivot_count()
            ));
            for (index, pivot) in hierarchy.pivots.iter().enumerate() {
                let depth = depth_of(&hierarchy.pivots, index);
                lines.push(format!("  {}[{}] {}", "  ".repeat(depth), index, pivot.name));
            }
        }
        None => lines.push("Hierarchy: none (external skeleton)".to_string()),
    }

    for mesh in &scene.meshes {
        let skin = if mesh.is_skinned() { ", skinned" } else { "" };
        lines.push(format!(
            "Mesh '{}': {} vertices, {} triangles, {} materials{}",
            mesh.full_name(),
            mesh.vertices.len(),
            mesh.triangles.len(),
            mesh.materials.len(),
            skin
        ));
    }

    if let Some(hlod) = &scene.hlod {
        lines.push(format!(
            "HLOD '{}' -> '{}': {} LODs, {} aggregates",
            hlod.name,
            hlod.hierarchy_name,
            hlod.lods.len(),
            hlod.aggregates.as_ref().map_or(0, |a| a.sub_objects.len())
        ));
    }

    for animation in &scene.animations {
        lines.push(animation_line(animation));
    }

    for chunk in &scene.extra_chunks {
        lines.push(format!(
            "Chunk {}: {} bytes (passed through)",
            tag_label(chunk.tag),
            chunk.payload_len()
        ));
    }

    lines
}

fn animation_line(animation: &Animation) -> String {
    let encoding = animation
        .encoding()
        .map(|c| c.name())
        .unwrap_or("empty");
    format!(
        "Animation '{}' on '{}': {} frames @ {} fps ({:.2}s), {} channels, {}",
        animation.name,
        animation.hierarchy_name,
        animation.frame_count,
        animation.frames_per_second,
        animation.duration(),
        animation.channels.len(),
        encoding
    )
}

fn depth_of(pivots: &[w3d_common::Pivot], index: usize) -> usize {
    let mut depth = 0;
    let mut current = pivots[index].parent_index;
    while current >= 0 && depth < pivots.len() {
        depth += 1;
        current = pivots
            .get(current as usize)
            .map(|p| p.parent_index)
            .unwrap_or(-1);
    }
    depth
}
