pub mod hit_testing;
pub mod quad;

pub use hit_testing::{Placement, handle_hit_radius, hit_test_handles};
pub use quad::{
    Circle, Point, Quadrilateral, get_line_angle, get_line_length, is_point_within_circle,
    sort_convex_quadrilateral_points,
};
