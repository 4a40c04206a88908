pub mod fixture;
pub mod http;

pub use fixture::FixtureResolver;
pub use http::HttpResolver;
