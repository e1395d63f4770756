pub mod density;
pub mod feature;
pub mod filter;
