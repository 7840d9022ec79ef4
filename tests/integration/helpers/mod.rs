pub mod test_config;

pub use test_config::{create_cached_test_client, create_test_client, create_test_config};
