pub mod entity;
pub mod environment;
pub mod geometry;
pub mod phase;
pub mod product;
pub mod trial;

pub use entity::{Capability, CartItem, CollisionDetection, EntityId, RigidBody, SceneProduct};
pub use environment::{ConditionTable, EnvironmentParams, Levels};
pub use geometry::{Aabb, Surface, Transform};
pub use phase::SessionPhase;
pub use product::{PriceTable, ProductId, ProductRecord};
pub use trial::{ShelfSlot, TrialKey, TrialLogEntry, TrialRecord};
