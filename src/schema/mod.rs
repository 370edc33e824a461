pub mod template;
pub mod value;
