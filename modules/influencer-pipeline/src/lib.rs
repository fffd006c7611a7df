pub mod catalog_sync;
pub mod descriptions;
pub mod image_resolver;
pub mod matcher;
pub mod research;
pub mod seeder;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
