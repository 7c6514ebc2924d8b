/// Field holding the document identifier.
pub const DOC_ID: &str = "_id";

/// Fields managed by the database and never treated as user data.
pub const RESERVED_FIELDS: [&str; 1] = [DOC_ID];

pub const CREATED_TIME: &str = "created_at";
pub const OWNER: &str = "owner";
pub const UNIQUE_ID: &str = "uuid";

/// Separator reserved for internal map names; never allowed in a collection name.
pub const INTERNAL_NAME_SEPARATOR: &str = "|";

/// Prefix of worker thread names spawned by the event bus.
pub const EVENT_WORKER_PREFIX: &str = "docdb-event";

/// Prefix of worker thread names spawned for background index builds.
pub const INDEX_WORKER_PREFIX: &str = "docdb-index";
