mod mesh;
mod shaders;
mod state;

pub use mesh::MeshVertex;
pub use state::RenderSurface;
