pub mod document;
pub mod extract;
pub mod paths;
pub mod text;
