// mapofus/src/model/mod.rs

//! Persistent records shared by every layer.

pub mod coupon;
pub mod identity;
pub mod order;
pub mod settings;

pub use coupon::Coupon;
pub use identity::Identity;
pub use order::{ImageVariant, Order, OrderStatus, PaymentStatus, QaAnswer, StoryMetadata, Theme};
pub use settings::{AppSettings, ADMIN_ROLE, DEFAULT_IMAGE_PROVIDER};
