use indy_syntax::ParseError;

/// Why an advice class could not be migrated.
///
/// Every variant aborts the current compilation unit only; the unit is left
/// exactly as it was parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrateError {
    #[error("enter and exit declare different advice locals (enter: {enter:?}, exit: {exit:?})")]
    MismatchedLocals {
        enter: Vec<String>,
        exit: Vec<String>,
    },
    #[error("method `{method}` has more than one writable @Advice.Return parameter")]
    MultipleWritableReturns { method: String },
    #[error("class `{class}` has more than one method annotated with @Advice.{marker}")]
    DuplicateAdviceMethod { class: String, marker: &'static str },
    #[error("method `{method}` has more than one @Advice.Enter parameter")]
    DuplicateEnterBinding { method: String },
    #[error("method `{method}` binds advice local \"{key}\" more than once")]
    DuplicateLocal { method: String, key: String },
    #[error("exit method `{method}` binds @Advice.Enter but the class has no enter method")]
    EnterBindingWithoutEnterMethod { method: String },
    #[error("method `{method}` returns from a statement that is not directly inside a block")]
    UnsupportedReturnPosition { method: String },
    #[error("parameter `{param}`: {message}")]
    InvalidAnnotationValue { param: String, message: String },
    #[error("advice method `{method}` has no body")]
    MissingBody { method: String },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl MigrateError {
    /// Errors caused by advice that is inconsistent in itself, as opposed to
    /// advice the rewrite does not know how to handle.
    pub fn is_malformed_advice(&self) -> bool {
        matches!(
            self,
            MigrateError::MismatchedLocals { .. }
                | MigrateError::MultipleWritableReturns { .. }
                | MigrateError::DuplicateAdviceMethod { .. }
                | MigrateError::DuplicateEnterBinding { .. }
                | MigrateError::DuplicateLocal { .. }
                | MigrateError::EnterBindingWithoutEnterMethod { .. }
                | MigrateError::InvalidAnnotationValue { .. }
        )
    }
}
