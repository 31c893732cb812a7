pub mod aggregate;
pub mod filter;
pub mod paginate;
pub mod tree;
