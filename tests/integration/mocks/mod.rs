pub mod artifactory_mock;

pub use artifactory_mock::{
    setup_artifactory_mock,
    setup_delayed_artifactory_mock,
    NODE_ID,
};
