pub mod detection_models;
pub mod user_models;

pub use detection_models::{BusImageEvent, DetectionEvent, BUS_IMAGES_COLLECTION};
pub use user_models::{AuthToken, AuthenticatedUser, LoginCredentials, User, UserRole};
