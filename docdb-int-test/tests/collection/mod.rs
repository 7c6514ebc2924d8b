mod collection_test;
mod index_test;
mod lifecycle_test;
