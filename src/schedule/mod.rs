pub mod clock;
pub mod debounce;
pub mod pipeline;
