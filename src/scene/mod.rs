//! The particle scene: shapes, animated nodes and the director driving them

pub mod director;
pub mod frame;
pub mod nodes;
pub mod post;
pub mod rng;
pub mod shapes;

pub use director::Director;
pub use frame::{Camera, SceneFrame};
pub use post::PostChain;
pub use shapes::{Shape, ShapeKind};
