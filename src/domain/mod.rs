pub mod change;
pub mod comment;
pub mod ownership;
pub mod post;
pub mod profile;
pub mod reaction;
pub mod sample;
