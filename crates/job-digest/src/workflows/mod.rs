pub mod digest;
pub mod discovery;
