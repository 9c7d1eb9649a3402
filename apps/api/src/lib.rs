pub mod router;
pub mod seed;

pub use router::create_router;
