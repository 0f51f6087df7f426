mod bbox;
mod distance;
mod proj;

pub use bbox::BBox;
pub use distance::{distance, EARTH_RADIUS_M};
pub use proj::{SpatialReference, MAX_MERCATOR_LAT};
pub(crate) use proj::{lat_to_mercator_y, lon_to_mercator_x, mercator_x_to_lon, mercator_y_to_lat};
