pub mod element;
pub mod store;
