//! Error type shared by the session, the DOM reducer and the action layer.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("browser session not started - call initialize_browser first")]
    NotStarted,

    #[error("browser session already started - close it before starting another")]
    AlreadyStarted,

    #[error("navigation to {url} did not complete within {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("no element carries mmid \"{0}\" - the page may have changed, take a fresh snapshot and use a current identifier")]
    MmidNotFound(String),

    #[error("mmid \"{mmid}\" matches {count} elements, expected exactly one")]
    MmidAmbiguous { mmid: String, count: usize },

    #[error("invalid mmid \"{0}\": identifiers are numeric strings from the latest snapshot")]
    InvalidMmid(String),

    #[error("snapshot failed: {0}")]
    Snapshot(String),

    #[error("identifier counter regressed: seed was {seed} but reducer returned {returned}")]
    CounterRegressed { seed: u64, returned: u64 },

    #[error("credential placeholder {0} has no configured value")]
    CredentialUnavailable(&'static str),

    #[error("text was entered into mmid \"{text_mmid}\" but the click on mmid \"{click_mmid}\" failed: {source}")]
    CompoundClick {
        text_mmid: String,
        click_mmid: String,
        source: Box<Error>,
    },
}
