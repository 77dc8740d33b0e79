use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("template error: {0}")]
    Template(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<minijinja::Error> for CoreError {
    fn from(e: minijinja::Error) -> Self {
        CoreError::Template(e.to_string())
    }
}
