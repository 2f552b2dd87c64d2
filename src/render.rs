pub mod backend;
pub mod cpu;
pub mod recording;
pub mod renderer;
pub mod text;
