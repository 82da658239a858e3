#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid container id: {0}")]
    InvalidContainerID(String),
    #[error("no container id embedded in `{0}`")]
    MissingContainerID(String),
}
pub type Result<T> = std::result::Result<T, Error>;
