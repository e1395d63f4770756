pub mod draw;
pub mod hit_test;
pub mod map;
pub mod map_tile;
pub mod overview;
pub mod scale_line;
pub mod surface;
pub mod view;
