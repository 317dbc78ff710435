pub mod clock;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod naming;
pub mod node;
pub mod operations;
pub mod payload;
pub mod stats;
pub mod taxonomy;
pub mod template;
pub mod tree;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CoreError;
pub use ids::*;
pub use ledger::{DeletedItem, DeletedLedger};
pub use node::{Node, NodeField};
pub use operations::{MoveDirection, OperationPayload, OperationRecord};
pub use payload::{IdAssignment, SaveRequest, SaveResponse};
pub use taxonomy::{NodeType, NumberField};
pub use validate::Violation;
