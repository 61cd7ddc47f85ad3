pub mod host;
pub mod intel;
pub mod intelsystem;
pub mod position;
pub mod sim;
pub mod snapshot;
pub mod terrain;

pub use host::*;
pub use intel::*;
pub use position::*;
pub use snapshot::*;
pub use terrain::*;
