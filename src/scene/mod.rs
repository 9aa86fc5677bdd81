pub mod batcher;
pub mod body;
pub mod scenes;

pub use batcher::{FlatScene, SceneBatcher};
pub use body::{BodyId, BodySource, Mesh, MeshKey, SceneBody, Transform};
pub use scenes::create_demo_scene;
