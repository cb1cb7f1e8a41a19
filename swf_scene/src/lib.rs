//! Decodes SWF movies into the pieces a scene builder needs: resolved shape
//! geometry with styles, per-frame placement events, and the raw bitmap and
//! sound payloads.
//!
//! ```no_run
//! # fn main() -> swf_scene::Result<()> {
//! let data = std::fs::read("movie.swf")?;
//! let swf_buf = swf_scene::decompress_swf(&data)?;
//! let movie = swf_scene::parse_movie(&swf_buf)?;
//! let scene = swf_scene::build_scene(&movie, &swf_scene::SceneOptions::default())?;
//! println!("{} frames", scene.root.frames.len());
//! # Ok(())
//! # }
//! ```

pub mod bitmap;
pub mod display_list;
pub mod error;
pub mod movie;
pub mod read;
pub mod scene;
pub mod shape;
pub mod sound;
pub mod style;
pub mod tag;
pub mod types;

#[cfg(test)]
mod testing;

pub use display_list::{InterpretedMovie, interpret_movie};
pub use error::{Error, Result, Warning};
pub use movie::{Header, Movie, SwfBuf, decompress_swf, parse_movie};
pub use scene::{Scene, SceneOptions, build_scene};
pub use tag::Tag;
pub use types::CharacterId;
