use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use vitrine_assets::{ModelAsset, decode_animations, decode_model};

/// Inspect a binary glTF model or animation file the way the viewer sees it.
#[derive(Parser)]
struct Args {
    /// Path to the `.glb` file to inspect
    path: PathBuf,

    /// Treat the file as an animation-only asset
    #[arg(long)]
    animation: bool,

    /// Emit a JSON summary instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ClipSummary {
    name: String,
    duration: f32,
    tracks: usize,
}

#[derive(Serialize)]
struct MeshSummary {
    name: String,
    node: String,
    skinned: bool,
    vertices: usize,
    triangles: usize,
    bounds: Option<[[f32; 3]; 2]>,
}

#[derive(Serialize)]
struct AssetSummary {
    nodes: usize,
    meshes: Vec<MeshSummary>,
    skins: usize,
    materials: usize,
    textures: usize,
    clips: Vec<ClipSummary>,
}

fn summarize_model(model: &ModelAsset) -> AssetSummary {
    AssetSummary {
        nodes: model.nodes.len(),
        meshes: model
            .meshes
            .iter()
            .map(|mesh| MeshSummary {
                name: mesh.name.clone(),
                node: model.nodes[mesh.node].name.clone(),
                skinned: mesh.skin.is_some(),
                vertices: mesh.vertex_count(),
                triangles: mesh.triangle_count(),
                bounds: mesh
                    .bounds()
                    .map(|(min, max)| [min.to_array(), max.to_array()]),
            })
            .collect(),
        skins: model.skins.len(),
        materials: model.materials.len(),
        textures: model.textures.len(),
        clips: model
            .animations
            .iter()
            .map(|clip| ClipSummary {
                name: clip.name.clone(),
                duration: clip.duration,
                tracks: clip.tracks.len(),
            })
            .collect(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes = fs::read(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    let location = args.path.display().to_string();

    let summary = if args.animation {
        let clips = decode_animations(&location, &bytes)?;
        AssetSummary {
            nodes: 0,
            meshes: Vec::new(),
            skins: 0,
            materials: 0,
            textures: 0,
            clips: clips
                .iter()
                .map(|clip| ClipSummary {
                    name: clip.name.clone(),
                    duration: clip.duration,
                    tracks: clip.tracks.len(),
                })
                .collect(),
        }
    } else {
        summarize_model(&decode_model(&location, &bytes)?)
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{location}");
    println!(
        "nodes: {}  skins: {}  materials: {}  textures: {}",
        summary.nodes, summary.skins, summary.materials, summary.textures
    );
    for mesh in &summary.meshes {
        println!(
            "mesh {:<24} node {:<24} {:>6} verts {:>6} tris{}",
            mesh.name,
            mesh.node,
            mesh.vertices,
            mesh.triangles,
            if mesh.skinned { "  skinned" } else { "" }
        );
    }
    for clip in &summary.clips {
        println!(
            "clip {:<24} {:>7.3}s  {} tracks",
            clip.name, clip.duration, clip.tracks
        );
    }
    Ok(())
}
