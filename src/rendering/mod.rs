pub mod foliage;
pub mod frustum_debug;
pub mod ground;
pub mod instances;
pub mod pipeline;
pub mod renderer;
pub mod slime;
