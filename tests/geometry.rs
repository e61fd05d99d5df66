use myseum_frame::geometry::{
    Point, Quadrilateral, get_line_angle, get_line_length, sort_convex_quadrilateral_points,
};
use myseum_frame::perspective::PerspectiveTransform;

fn quad(points: [(f64, f64); 4]) -> Quadrilateral {
    Quadrilateral::new(points.map(|(x, y)| Point::new(x, y)))
}

#[test]
fn test_sort_orders_corners_and_is_idempotent() {
    let shuffled = quad([(1.0, 1.0), (0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
    let sorted = sort_convex_quadrilateral_points(&shuffled);
    assert_eq!(sorted, Quadrilateral::unit_square());

    let skewed = quad([(0.8, 0.95), (0.05, 0.1), (0.1, 0.9), (0.9, 0.05)]);
    let once = skewed.sorted();
    assert_eq!(once.sorted(), once);
    assert_eq!(once.points[0], Point::new(0.05, 0.1));
    assert_eq!(once.points[2], Point::new(0.8, 0.95));
}

#[test]
fn test_line_length_and_angle() {
    let (a, b) = (Point::new(0.0, 0.0), Point::new(3.0, 4.0));
    assert_eq!(get_line_length(a, b), 5.0);
    assert!((get_line_angle(a, b) - 53.130_102_354_155_98).abs() < 1e-9);
}

#[test]
fn test_perspective_identity_and_scale() {
    let unit = Quadrilateral::unit_square().to_matrix();
    let identity = PerspectiveTransform::new(unit, unit).unwrap();
    for (x, y) in [(0.5, 0.5), (0.1, 0.9), (0.33, 0.66)] {
        let [tx, ty] = identity.transform(x, y);
        assert!((tx - x).abs() < 1e-9 && (ty - y).abs() < 1e-9);
    }

    let (w, h) = (640.0, 480.0);
    let scale = PerspectiveTransform::new(
        Quadrilateral::rect(0.0, 0.0, w, h).to_matrix(),
        Quadrilateral::rect(0.0, 0.0, 2.0 * w, 2.0 * h).to_matrix(),
    )
    .unwrap();
    let [x, y] = scale.transform(100.0, 37.5);
    assert!((x - 200.0).abs() < 1e-9 && (y - 75.0).abs() < 1e-9);
}

#[test]
fn test_perspective_rejects_identical_points() {
    let same = [0.3; 8];
    let unit = Quadrilateral::unit_square().to_matrix();
    assert!(PerspectiveTransform::new(same, unit).is_err());
}
