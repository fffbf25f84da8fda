/// Horse identities are small stable integers assigned at startup (1..N).
pub type HorseId = i64;

/// Question identities are opaque strings (UUIDs generated at startup).
pub type QuestionId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
