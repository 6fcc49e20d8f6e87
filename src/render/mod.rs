pub mod animation;
pub mod backend;
pub mod canvas;
pub mod direct;
pub mod ease;
pub mod offload;
pub mod paint;
pub mod select;
pub mod surface;
