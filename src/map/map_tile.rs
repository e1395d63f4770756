use std::f64::consts::PI;

use anyhow::{Context, Result};
use geo::{coord, Coord, Rect};

/// Basemap tile key as `(zoom, x, y)`.
pub type TileKey = (u32, u32, u32);

/// WGS84 semi-major axis, the sphere radius used by Web Mercator.
pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Half the width of the projected world in meters.
pub const HALF_WORLD: f64 = PI * EARTH_RADIUS;
/// Latitude where Web Mercator becomes a square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;
pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 19.0;

/// Project a longitude/latitude pair (degrees) to Web Mercator meters.
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> Coord<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    coord! {
        x: EARTH_RADIUS * lon.to_radians(),
        y: EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln(),
    }
}

/// Inverse of [`lon_lat_to_mercator`], returns `(lon, lat)` in degrees.
pub fn mercator_to_lon_lat(c: Coord<f64>) -> (f64, f64) {
    let lon = (c.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (c.y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

/// Meters per pixel at the given (fractional) zoom level.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    2.0 * HALF_WORLD / TILE_SIZE / 2.0_f64.powf(zoom)
}

pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (2.0 * HALF_WORLD / TILE_SIZE / resolution).log2()
}

/// Ground distance covered by one pixel at `c`, which shrinks with the
/// cosine of the latitude.
pub fn point_resolution(resolution: f64, c: Coord<f64>) -> f64 {
    resolution / (c.y / EARTH_RADIUS).cosh()
}

/// Tile zoom level to fetch for a view at `zoom`.
pub fn tile_zoom(zoom: f64) -> u32 {
    zoom.round().clamp(MIN_ZOOM, MAX_ZOOM) as u32
}

/// Projected extent of a tile.
pub fn tile_extent((z, x, y): TileKey) -> Rect<f64> {
    let span = 2.0 * HALF_WORLD / 2.0_f64.powi(z as i32);
    let west = -HALF_WORLD + x as f64 * span;
    let north = HALF_WORLD - y as f64 * span;
    Rect::new(coord! { x: west, y: north - span }, coord! { x: west + span, y: north })
}

/// All tiles at zoom `z` touching `extent`, clamped to the world.
pub fn tiles_covering(extent: Rect<f64>, z: u32) -> Vec<TileKey> {
    let n = 2_u32.pow(z);
    let span = 2.0 * HALF_WORLD / n as f64;
    let index = |offset: f64| ((offset / span).floor().max(0.0) as u32).min(n - 1);

    let min_x = index(extent.min().x + HALF_WORLD);
    let max_x = index(extent.max().x + HALF_WORLD);
    let min_y = index(HALF_WORLD - extent.max().y);
    let max_y = index(HALF_WORLD - extent.min().y);

    let mut tiles = Vec::new();
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            tiles.push((z, x, y));
        }
    }
    tiles
}

/// A decoded basemap tile. The GPU texture is created lazily on first paint,
/// since decoding happens off the UI thread without an egui context.
pub struct MapTile {
    pub key: TileKey,
    image: egui::ColorImage,
    texture: Option<egui::TextureHandle>,
}

impl MapTile {
    pub fn decode(key: TileKey, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .with_context(|| format!("decoding tile {:?}", key))?
            .to_rgba8();
        let size = [image.width() as usize, image.height() as usize];
        Ok(Self {
            key,
            image: egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()),
            texture: None,
        })
    }

    pub fn texture(&mut self, ctx: &egui::Context) -> &egui::TextureHandle {
        let (z, x, y) = self.key;
        let image = &mut self.image;
        self.texture.get_or_insert_with(|| {
            ctx.load_texture(
                format!("tile_{}_{}_zoom{}", x, y, z),
                std::mem::take(image),
                egui::TextureOptions::LINEAR,
            )
        })
    }
}
