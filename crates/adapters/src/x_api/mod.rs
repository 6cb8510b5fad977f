//! X (Twitter) timeline adapters, served through RapidAPI

mod normalize;
mod read;

pub use normalize::decode_entities;
pub use read::{DEFAULT_RAPIDAPI_HOST, RapidApiConfig, RapidApiPostSource};
