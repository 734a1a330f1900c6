pub mod factory;
pub mod market_data;
pub mod mock;
pub mod news;
pub mod observability;

pub use factory::ServiceFactory;
