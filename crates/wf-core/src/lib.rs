pub mod align;
pub mod geometry;
pub mod hit;
pub mod id;
pub mod model;
pub mod workflow;

pub use align::{AlignEdge, align_positions};
pub use geometry::{Bounds, DEFAULT_NODE_SIZE, DUPLICATE_OFFSET, Position, Size};
pub use id::{ConnectionId, NodeId};
pub use model::*;
pub use workflow::{Workflow, WorkflowDocument, WorkflowError, WorkflowSnapshot};
