mod cpu;
mod stub;

pub use cpu::{CpuBackend, MIN_NEIGHBORS};
pub use stub::StubBackend;
