//! Image and font loading

pub mod font;
pub mod image;

pub use self::font::FontFace;
pub use self::image::{decode_image, save_png, ImageCache};
