//! User-drawn overlay: sketching new shapes, snapping to existing vertices,
//! and dragging vertices of finished shapes.
//!
//! All coordinates are projected map coordinates; tolerances are passed in
//! map units so the caller can derive them from a pixel distance at the
//! current resolution.

use geo::Coord;

use crate::config::DrawKind;

/// Pixel distance within which pointer positions snap and grab.
pub const PIXEL_TOLERANCE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawnShape {
    Point(Coord<f64>),
    LineString(Vec<Coord<f64>>),
    /// Open ring; the closing edge is implied.
    Polygon(Vec<Coord<f64>>),
    Circle { center: Coord<f64>, radius: f64 },
}

impl DrawnShape {
    fn vertices(&self) -> &[Coord<f64>] {
        match self {
            DrawnShape::Point(c) => std::slice::from_ref(c),
            DrawnShape::LineString(vertices) | DrawnShape::Polygon(vertices) => vertices,
            DrawnShape::Circle { center, .. } => std::slice::from_ref(center),
        }
    }

    fn vertices_mut(&mut self) -> &mut [Coord<f64>] {
        match self {
            DrawnShape::Point(c) => std::slice::from_mut(c),
            DrawnShape::LineString(vertices) | DrawnShape::Polygon(vertices) => vertices,
            DrawnShape::Circle { center, .. } => std::slice::from_mut(center),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Handle {
    /// A vertex, or the center of a circle.
    Vertex { shape: usize, vertex: usize },
    CircleRim { shape: usize },
}

#[derive(Debug, Default)]
pub struct DrawLayer {
    kind: DrawKind,
    shapes: Vec<DrawnShape>,
    sketch: Vec<Coord<f64>>,
    grabbed: Option<Handle>,
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

impl DrawLayer {
    pub fn kind(&self) -> DrawKind {
        self.kind
    }

    /// Switch the geometry kind. Finished shapes stay, an unfinished sketch
    /// is dropped.
    pub fn set_kind(&mut self, kind: DrawKind) {
        if kind != self.kind {
            self.sketch.clear();
            self.kind = kind;
        }
    }

    pub fn shapes(&self) -> &[DrawnShape] {
        &self.shapes
    }

    /// Vertices placed so far for the shape being drawn.
    pub fn sketch(&self) -> &[Coord<f64>] {
        &self.sketch
    }

    /// Nearest existing vertex within `tolerance` of `c`, or `c` itself.
    pub fn snap(&self, c: Coord<f64>, tolerance: f64) -> Coord<f64> {
        self.shapes.iter()
            .flat_map(|shape| shape.vertices().iter().copied())
            .map(|vertex| (distance(vertex, c), vertex))
            .filter(|&(d, _)| d <= tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(c, |(_, vertex)| vertex)
    }

    pub fn click(&mut self, c: Coord<f64>, tolerance: f64) {
        let c = self.snap(c, tolerance);
        match self.kind {
            DrawKind::None => {}
            DrawKind::Point => self.shapes.push(DrawnShape::Point(c)),
            DrawKind::LineString => self.sketch.push(c),
            DrawKind::Polygon => {
                let closes = self.sketch.len() >= 3 && distance(self.sketch[0], c) <= tolerance;
                if closes {
                    self.finish();
                } else {
                    self.sketch.push(c);
                }
            }
            DrawKind::Circle => match self.sketch.first() {
                None => self.sketch.push(c),
                Some(&center) => {
                    let radius = distance(center, c);
                    if radius > 0.0 {
                        self.shapes.push(DrawnShape::Circle { center, radius });
                        self.sketch.clear();
                    }
                }
            },
        }
    }

    /// The first click of a double click has already placed its vertex, so
    /// this only finishes lines and polygons.
    pub fn double_click(&mut self, c: Coord<f64>, tolerance: f64) {
        match self.kind {
            DrawKind::LineString | DrawKind::Polygon => self.finish(),
            DrawKind::Circle => self.click(c, tolerance),
            DrawKind::None | DrawKind::Point => {}
        }
    }

    /// Abort the shape being drawn.
    pub fn cancel(&mut self) {
        self.sketch.clear();
    }

    fn finish(&mut self) {
        let shape = match self.kind {
            DrawKind::LineString if self.sketch.len() >= 2 => DrawnShape::LineString(std::mem::take(&mut self.sketch)),
            DrawKind::Polygon if self.sketch.len() >= 3 => DrawnShape::Polygon(std::mem::take(&mut self.sketch)),
            _ => return,
        };
        self.shapes.push(shape);
    }

    /// Start modifying the vertex, circle center, or circle rim under `c`.
    /// Returns whether something was grabbed.
    pub fn grab(&mut self, c: Coord<f64>, tolerance: f64) -> bool {
        let vertices = self.shapes.iter().enumerate().flat_map(|(shape, s)| {
            s.vertices().iter().enumerate().map(move |(vertex, &v)| (distance(v, c), Handle::Vertex { shape, vertex }))
        });
        let rims = self.shapes.iter().enumerate().filter_map(|(shape, s)| match s {
            DrawnShape::Circle { center, radius } => Some(((distance(*center, c) - radius).abs(), Handle::CircleRim { shape })),
            _ => None,
        });

        self.grabbed = vertices.chain(rims)
            .filter(|&(d, _)| d <= tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, handle)| handle);
        self.grabbed.is_some()
    }

    pub fn is_grabbing(&self) -> bool {
        self.grabbed.is_some()
    }

    pub fn drag_to(&mut self, c: Coord<f64>) {
        match self.grabbed {
            Some(Handle::Vertex { shape, vertex }) => {
                if let Some(v) = self.shapes.get_mut(shape).and_then(|s| s.vertices_mut().get_mut(vertex)) {
                    *v = c;
                }
            }
            Some(Handle::CircleRim { shape }) => {
                if let Some(DrawnShape::Circle { center, radius }) = self.shapes.get_mut(shape) {
                    *radius = distance(*center, c);
                }
            }
            None => {}
        }
    }

    pub fn release(&mut self) {
        self.grabbed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    const TOL: f64 = 1.0;

    fn layer(kind: DrawKind) -> DrawLayer {
        let mut layer = DrawLayer::default();
        layer.set_kind(kind);
        layer
    }

    #[test]
    fn none_kind_draws_nothing() {
        let mut layer = layer(DrawKind::None);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        layer.double_click(coord! { x: 0.0, y: 0.0 }, TOL);
        assert!(layer.shapes().is_empty());
        assert!(layer.sketch().is_empty());
    }

    #[test]
    fn points_are_added_per_click() {
        let mut layer = layer(DrawKind::Point);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        layer.click(coord! { x: 10.0, y: 0.0 }, TOL);
        assert_eq!(layer.shapes().len(), 2);
    }

    #[test]
    fn line_finishes_on_double_click() {
        let mut layer = layer(DrawKind::LineString);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        layer.double_click(coord! { x: 0.0, y: 0.0 }, TOL);
        assert!(layer.shapes().is_empty(), "a single vertex is not a line");

        layer.click(coord! { x: 10.0, y: 0.0 }, TOL);
        layer.double_click(coord! { x: 10.0, y: 0.0 }, TOL);
        assert_eq!(
            layer.shapes(),
            &[DrawnShape::LineString(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 0.0 }])]
        );
        assert!(layer.sketch().is_empty());
    }

    #[test]
    fn polygon_closes_on_first_vertex() {
        let mut layer = layer(DrawKind::Polygon);
        for c in [coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 }] {
            layer.click(c, TOL);
        }
        layer.click(coord! { x: 0.5, y: 0.2 }, TOL);
        match layer.shapes() {
            [DrawnShape::Polygon(ring)] => assert_eq!(ring.len(), 3),
            other => panic!("unexpected shapes {:?}", other),
        }
    }

    #[test]
    fn circle_takes_center_then_radius() {
        let mut layer = layer(DrawKind::Circle);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        assert!(layer.shapes().is_empty(), "zero radius is ignored");
        layer.click(coord! { x: 3.0, y: 4.0 }, TOL);
        assert_eq!(layer.shapes(), &[DrawnShape::Circle { center: coord! { x: 0.0, y: 0.0 }, radius: 5.0 }]);
    }

    #[test]
    fn clicks_snap_to_existing_vertices() {
        let mut layer = layer(DrawKind::Point);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        layer.set_kind(DrawKind::LineString);
        layer.click(coord! { x: 0.6, y: -0.6 }, TOL);
        assert_eq!(layer.sketch(), &[coord! { x: 0.0, y: 0.0 }]);
        assert_eq!(layer.snap(coord! { x: 5.0, y: 5.0 }, TOL), coord! { x: 5.0, y: 5.0 });
    }

    #[test]
    fn switching_kind_drops_the_sketch_only() {
        let mut layer = layer(DrawKind::Point);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        layer.set_kind(DrawKind::Polygon);
        layer.click(coord! { x: 5.0, y: 5.0 }, TOL);
        layer.set_kind(DrawKind::Circle);
        assert!(layer.sketch().is_empty());
        assert_eq!(layer.shapes().len(), 1);

        layer.click(coord! { x: 5.0, y: 5.0 }, TOL);
        layer.cancel();
        assert!(layer.sketch().is_empty());
    }

    #[test]
    fn dragging_a_vertex_moves_it() {
        let mut layer = layer(DrawKind::LineString);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        layer.click(coord! { x: 10.0, y: 0.0 }, TOL);
        layer.double_click(coord! { x: 10.0, y: 0.0 }, TOL);

        assert!(!layer.grab(coord! { x: 5.0, y: 5.0 }, TOL));
        assert!(layer.grab(coord! { x: 9.5, y: 0.0 }, TOL));
        layer.drag_to(coord! { x: 20.0, y: 20.0 });
        layer.release();
        assert!(!layer.is_grabbing());
        assert_eq!(
            layer.shapes(),
            &[DrawnShape::LineString(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 20.0, y: 20.0 }])]
        );
    }

    #[test]
    fn circle_rim_changes_radius_and_center_moves_circle() {
        let mut layer = layer(DrawKind::Circle);
        layer.click(coord! { x: 0.0, y: 0.0 }, TOL);
        layer.click(coord! { x: 10.0, y: 0.0 }, TOL);

        assert!(layer.grab(coord! { x: 0.0, y: 10.4 }, TOL));
        layer.drag_to(coord! { x: 0.0, y: 20.0 });
        layer.release();

        assert!(layer.grab(coord! { x: 0.2, y: 0.0 }, TOL));
        layer.drag_to(coord! { x: 5.0, y: 5.0 });
        layer.release();

        assert_eq!(layer.shapes(), &[DrawnShape::Circle { center: coord! { x: 5.0, y: 5.0 }, radius: 20.0 }]);
    }
}
