pub mod extent;
pub mod frequency;
pub mod reducer;
pub mod time;
pub mod variable;
