//! Remote services: Overpass for POIs, an OpenAI-compatible chat endpoint for
//! activity labels, and Nominatim for reverse geocoding.

#[cfg(feature = "http")]
pub mod error;
#[cfg(feature = "http")]
pub mod llm;
#[cfg(feature = "http")]
pub mod nominatim;
#[cfg(feature = "http")]
pub mod overpass;

#[cfg(feature = "http")]
pub use error::SyncError;
#[cfg(feature = "http")]
pub use llm::ChatClient;
#[cfg(feature = "http")]
pub use nominatim::NominatimClient;
#[cfg(feature = "http")]
pub use overpass::OverpassClient;
