#![allow(missing_docs)]

mod mp4;
mod mpeg;
mod ofr;
pub(crate) mod util;
mod wav;
