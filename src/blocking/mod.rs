pub mod bridge;
pub mod sites;
