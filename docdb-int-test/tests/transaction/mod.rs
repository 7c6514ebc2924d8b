mod session_test;
mod transaction_collection_test;
mod transaction_failure_test;
