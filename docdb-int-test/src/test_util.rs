use docdb::collection::{DocDbCollection, Document};
use docdb::doc;
use docdb::docdb::DocDb;
use docdb::errors::DocDbResult;
use std::backtrace::Backtrace;
use std::thread;
use std::time::{Duration, Instant};

/// Runs a test with retry logic and error handling.
/// Tests run on the current thread so parallel test binaries do not spawn extra workers.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> DocDbResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> DocDbResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> DocDbResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", err_msg)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        eprintln!("\nBacktrace:\n{}", bt);
    }
    eprintln!("=====================================================\n");
    panic!(
        "Test failed after {} attempts: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    id: String,
    db: DocDb,
}

impl TestContext {
    pub fn new(id: String, db: DocDb) -> Self {
        Self { id, db }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn db(&self) -> DocDb {
        self.db.clone()
    }
}

pub fn create_test_context() -> DocDbResult<TestContext> {
    let id = uuid::Uuid::new_v4().to_string();
    let db = DocDb::builder().open_or_create()?;
    Ok(TestContext::new(id, db))
}

pub fn cleanup(ctx: TestContext) -> DocDbResult<()> {
    ctx.db().close()
}

pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc! {
            first_name: "fn1",
            last_name: "ln1",
            age: 31,
            emails: ["fn1@example.com", "ln1@example.com"],
            address: { city: "Kolkata", zip: 700001 },
        },
        doc! {
            first_name: "fn2",
            last_name: "ln2",
            age: 24,
            emails: ["fn2@example.com"],
            address: { city: "Paris", zip: 75001 },
        },
        doc! {
            first_name: "fn3",
            last_name: "ln2",
            age: 45,
            emails: [],
            address: { city: "Oslo", zip: 150 },
        },
    ]
}

pub fn insert_test_documents(collection: &DocDbCollection) -> DocDbResult<()> {
    collection.insert_many(create_test_docs())?;
    Ok(())
}
