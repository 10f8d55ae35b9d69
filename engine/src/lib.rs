use crate::image_model::ImageModel;

pub mod error;
pub mod http;
pub mod image_model;
pub mod session;
pub mod token;

pub use error::AppError;

pub type ImgModBox = Box<dyn ImageModel + Send + Sync>;
