pub mod instrument;
pub mod provider;
pub mod reference;
pub mod selection;

pub use instrument::{Instrument, Sector};
pub use provider::{StaticUniverse, UniverseCache, UniverseProvider, UniverseSnapshot, UniverseSource};
pub use reference::{reference_instruments, ReferenceUniverse};
pub use selection::{select_universe, RankingMetric, UniverseSelection};
