use std::f64::consts::PI;
use std::time::Duration;

use egui::{pos2, Pos2, Rect as ScreenRect, Vec2};
use geo::{coord, Coord, Rect};

use super::map_tile::{resolution_for_zoom, zoom_for_resolution, MAX_ZOOM, MIN_ZOOM};

/// Maps a linear progress in `[0, 1]` to an eased progress.
pub type Easing = fn(f64) -> f64;

/// Overshooting spring, settles at 1.
pub fn elastic(t: f64) -> f64 {
    2.0_f64.powf(-10.0 * t) * ((t - 0.075) * (2.0 * PI) / 0.3).sin() + 1.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationTarget {
    pub center: Coord<f64>,
    pub zoom: f64,
}

#[derive(Debug, Clone)]
struct Animation {
    source_center: Coord<f64>,
    source_resolution: f64,
    target_center: Coord<f64>,
    target_resolution: f64,
    /// Set on the first tick, so the clock starts when the frame does.
    start: Option<f64>,
    duration: f64,
    easing: Easing,
}

/// Center and zoom of a map, in Web Mercator meters and meters per pixel.
#[derive(Debug, Clone)]
pub struct View {
    center: Coord<f64>,
    resolution: f64,
    animation: Option<Animation>,
}

impl View {
    pub fn new(center: Coord<f64>, zoom: f64) -> Self {
        Self {
            center,
            resolution: resolution_for_zoom(zoom.clamp(MIN_ZOOM, MAX_ZOOM)),
            animation: None,
        }
    }

    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn zoom(&self) -> f64 {
        zoom_for_resolution(self.resolution)
    }

    pub fn set_center(&mut self, center: Coord<f64>) {
        self.center = center;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.resolution = resolution_for_zoom(zoom.clamp(MIN_ZOOM, MAX_ZOOM));
    }

    /// Zoom by `delta` levels keeping `anchor` (a map coordinate) fixed on
    /// screen.
    pub fn zoom_around(&mut self, delta: f64, anchor: Coord<f64>) {
        let before = self.resolution;
        self.set_zoom(self.zoom() + delta);
        let ratio = self.resolution / before;
        self.center = anchor + (self.center - anchor) * ratio;
    }

    /// Move the map by a screen-space drag.
    pub fn pan_pixels(&mut self, delta: Vec2) {
        self.center.x -= delta.x as f64 * self.resolution;
        self.center.y += delta.y as f64 * self.resolution;
    }

    pub fn animate(&mut self, target: AnimationTarget, duration: Duration, easing: Easing) {
        self.animation = Some(Animation {
            source_center: self.center,
            source_resolution: self.resolution,
            target_center: target.center,
            target_resolution: resolution_for_zoom(target.zoom.clamp(MIN_ZOOM, MAX_ZOOM)),
            start: None,
            duration: duration.as_secs_f64(),
            easing,
        });
    }

    pub fn cancel_animation(&mut self) {
        self.animation = None;
    }

    /// Advance a running animation to time `now` (seconds). Returns whether
    /// the animation still needs frames.
    pub fn tick(&mut self, now: f64) -> bool {
        let Some(animation) = self.animation.as_mut() else { return false };
        let start = *animation.start.get_or_insert(now);

        let progress = if animation.duration > 0.0 {
            ((now - start) / animation.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };

        if progress >= 1.0 {
            self.center = animation.target_center;
            self.resolution = animation.target_resolution;
            self.animation = None;
            return false;
        }

        let eased = (animation.easing)(progress);
        self.center = animation.source_center + (animation.target_center - animation.source_center) * eased;
        self.resolution = animation.source_resolution
            + eased * (animation.target_resolution - animation.source_resolution);
        // The elastic curve can overshoot far enough to cross zero.
        self.resolution = self.resolution.max(resolution_for_zoom(MAX_ZOOM + 2.0));
        true
    }

    pub fn to_screen(&self, viewport: ScreenRect, c: Coord<f64>) -> Pos2 {
        let center = viewport.center();
        pos2(
            center.x + ((c.x - self.center.x) / self.resolution) as f32,
            center.y - ((c.y - self.center.y) / self.resolution) as f32,
        )
    }

    pub fn to_map(&self, viewport: ScreenRect, p: Pos2) -> Coord<f64> {
        let center = viewport.center();
        coord! {
            x: self.center.x + (p.x - center.x) as f64 * self.resolution,
            y: self.center.y - (p.y - center.y) as f64 * self.resolution,
        }
    }

    /// Projected extent visible in `viewport`.
    pub fn extent(&self, viewport: ScreenRect) -> Rect<f64> {
        Rect::new(self.to_map(viewport, viewport.left_top()), self.to_map(viewport, viewport.right_bottom()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use egui::vec2;

    fn viewport() -> ScreenRect {
        ScreenRect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))
    }

    #[test]
    fn elastic_starts_at_rest_and_settles() {
        assert_abs_diff_eq!(elastic(0.0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(elastic(1.0), 1.0, epsilon = 1e-3);
        assert!(elastic(0.2) > 1.0, "overshoots");
    }

    #[test]
    fn screen_and_map_are_inverse() {
        let view = View::new(coord! { x: -11_542_437.75, y: 4_862_581.06 }, 4.0);
        let p = pos2(123.0, 456.0);
        let back = view.to_screen(viewport(), view.to_map(viewport(), p));
        assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-3);
        assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-3);
        assert_eq!(view.to_screen(viewport(), view.center()), viewport().center());
    }

    #[test]
    fn screen_y_grows_southward() {
        let view = View::new(coord! { x: 0.0, y: 0.0 }, 2.0);
        let north = view.to_screen(viewport(), coord! { x: 0.0, y: 1_000_000.0 });
        assert!(north.y < viewport().center().y);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = View::new(coord! { x: 0.0, y: 0.0 }, 4.0);
        view.set_zoom(30.0);
        assert_abs_diff_eq!(view.zoom(), MAX_ZOOM, epsilon = 1e-9);
        view.set_zoom(-2.0);
        assert_abs_diff_eq!(view.zoom(), MIN_ZOOM, epsilon = 1e-9);
    }

    #[test]
    fn zoom_around_keeps_anchor_in_place() {
        let mut view = View::new(coord! { x: 0.0, y: 0.0 }, 4.0);
        let anchor_screen = pos2(700.0, 100.0);
        let anchor = view.to_map(viewport(), anchor_screen);
        view.zoom_around(1.0, anchor);
        assert_abs_diff_eq!(view.zoom(), 5.0, epsilon = 1e-9);
        let after = view.to_screen(viewport(), anchor);
        assert_abs_diff_eq!(after.x, anchor_screen.x, epsilon = 1e-2);
        assert_abs_diff_eq!(after.y, anchor_screen.y, epsilon = 1e-2);
    }

    #[test]
    fn pan_follows_the_pointer() {
        let mut view = View::new(coord! { x: 0.0, y: 0.0 }, 4.0);
        let grabbed = view.to_map(viewport(), pos2(400.0, 300.0));
        view.pan_pixels(vec2(50.0, -20.0));
        let moved = view.to_screen(viewport(), grabbed);
        assert_abs_diff_eq!(moved.x, 450.0, epsilon = 1e-3);
        assert_abs_diff_eq!(moved.y, 280.0, epsilon = 1e-3);
    }

    fn linear(t: f64) -> f64 {
        t
    }

    #[test]
    fn animation_reaches_its_target() {
        let mut view = View::new(coord! { x: 0.0, y: 0.0 }, 4.0);
        let target = AnimationTarget { center: coord! { x: 1000.0, y: -500.0 }, zoom: 6.0 };
        view.animate(target, Duration::from_millis(2000), linear);

        assert!(view.tick(10.0));
        assert_eq!(view.center(), coord! { x: 0.0, y: 0.0 });

        assert!(view.tick(11.0));
        assert_abs_diff_eq!(view.center().x, 500.0, epsilon = 1e-9);
        assert_abs_diff_eq!(view.center().y, -250.0, epsilon = 1e-9);

        assert!(!view.tick(12.5));
        assert!(!view.tick(13.0));
        assert_eq!(view.center(), target.center);
        assert_abs_diff_eq!(view.zoom(), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn cancelled_animation_stops_in_place() {
        let mut view = View::new(coord! { x: 0.0, y: 0.0 }, 4.0);
        view.animate(AnimationTarget { center: coord! { x: 1000.0, y: 0.0 }, zoom: 4.0 }, Duration::from_secs(1), elastic);
        view.tick(0.0);
        view.tick(0.5);
        let midway = view.center();
        view.cancel_animation();
        assert!(!view.tick(0.9));
        assert_eq!(view.center(), midway);
    }

    #[test]
    fn zero_duration_jumps() {
        let mut view = View::new(coord! { x: 0.0, y: 0.0 }, 4.0);
        view.animate(AnimationTarget { center: coord! { x: 5.0, y: 5.0 }, zoom: 2.0 }, Duration::ZERO, elastic);
        assert!(!view.tick(3.0));
        assert_eq!(view.center(), coord! { x: 5.0, y: 5.0 });
    }
}
