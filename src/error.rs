use thiserror::Error;

use crate::eval::context::EvalFailed;
use crate::eval::expr::InitError;
use crate::eval::func::ConstructError;
use crate::object::ObjectError;
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Construction error: {0}")]
    Construct(#[from] ConstructError),
    #[error("Init error: {0}")]
    Init(#[from] InitError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalFailed),
    #[error("Object error: {0}")]
    Object(#[from] ObjectError),
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
