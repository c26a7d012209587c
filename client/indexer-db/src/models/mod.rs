pub mod applied_event;
pub mod block;
pub mod bsp;
pub mod bsp_file;
pub mod bucket;
pub mod deletion_intent;
pub mod file;
pub mod msp;
pub mod msp_file;
pub mod service_state;

pub use applied_event::AppliedEvent;
pub use block::Block;
pub use bsp::Bsp;
pub use bsp_file::BspFile;
pub use bucket::Bucket;
pub use deletion_intent::{DeletionIntent, IntentKind, IntentStatus, TargetKind};
pub use file::File;
pub use msp::Msp;
pub use msp_file::MspFile;
pub use service_state::ServiceState;
