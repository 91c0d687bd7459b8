//! Domain models for the steel plant

pub mod bay;
pub mod crane;
pub mod event;
pub mod grade;
pub mod heat;
pub mod ladle;
pub mod ladle_car;
pub mod state;
pub mod transport_request;
pub mod unit;

// Re-exports
pub use bay::Bay;
pub use crane::{Crane, CraneStatus, CraneTask};
pub use event::{Event, EventLog};
pub use grade::{GradeCatalog, SteelGrade};
pub use heat::{Heat, HeatLocation, HeatStatus, ProcessRecord, QualityFlag};
pub use ladle::{Ladle, LadleStatus};
pub use ladle_car::{LadleCar, LadleCarStatus, LadleCarType};
pub use state::PlantState;
pub use transport_request::{TransferStage, TransportRequest};
pub use unit::{BlockReason, Occupant, OccupantPhase, ProductionUnit, UnitKind, UnitState};
