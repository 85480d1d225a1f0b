pub mod error;
pub mod packer;
pub mod pipeline;
pub mod settlement;
pub mod stocking;

pub use error::LayoutError;
pub use packer::{Placement, PlacementKind, find_position, grid_capacity};
pub use pipeline::{
    CartConfig, CartEvent, CartPipeline, Contact, PlacementMode, PurchaseOutcome, VolumeId,
};
pub use settlement::{Settlement, SettlementPoll, SettlementStage};
pub use stocking::{
    ShelfSpec, SlotInfo, aligned_offset, natural_cmp, next_free_slot, slot_product_id,
    stock_layout,
};
