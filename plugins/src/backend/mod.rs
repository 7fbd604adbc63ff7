pub mod float;
pub mod nextflow;

pub use float::FloatRunner;
pub use nextflow::NextflowRunner;
