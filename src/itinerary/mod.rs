//! Itinerary assembly and persistence

pub mod assembler;
pub mod store;
pub mod writer;

pub use assembler::{Apportionment, Assembly, ItineraryAssembler, Stay, apportion_nights};
pub use store::{FjallItineraryStore, InsertOutcome, ItineraryStore, MemoryItineraryStore};
pub use writer::{ItineraryWriter, NameGenerator, SuffixNameGenerator};
