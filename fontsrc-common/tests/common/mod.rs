pub mod fixtures;
pub mod logging;

#[allow(unused_imports)]
pub use fixtures::{CorpusFixture, repo_metadata, tree_snapshot};
pub use logging::init_test_logging;
