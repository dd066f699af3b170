use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridBotError {
    #[error("exchange error: {0}")]
    Exchange(#[from] exchange_client::ExchangeError),

    #[error("indicator feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),
}

pub type GridBotResult<T> = Result<T, GridBotError>;
