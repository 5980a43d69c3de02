pub mod bbox;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod geopoint;
pub mod route;
pub mod tower;

pub use bbox::BoundingBox;
pub use error::RoutingError;
pub use geopoint::GeoPoint;
