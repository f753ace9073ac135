pub mod money;
pub mod text;
