pub mod images;
pub mod questions;

pub use images::{ImageError, ImageService};
pub use questions::{FollowUp, QuestionError, QuestionService};
