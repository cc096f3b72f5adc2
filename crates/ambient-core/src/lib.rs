pub mod automation;
pub mod config;
pub mod constants;
pub mod device;
pub mod engine;
pub mod error;
pub mod mood;
pub mod music;
pub mod noise;
pub mod render;
pub mod task;
pub mod volume;

pub use automation::*;
pub use config::*;
pub use device::*;
pub use engine::*;
pub use error::*;
pub use mood::*;
pub use music::*;
pub use noise::*;
pub use render::*;
pub use task::*;
pub use volume::*;
