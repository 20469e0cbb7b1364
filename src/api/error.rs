// ==========================================
// 音乐学院管理后台 - API层错误类型
// ==========================================
// 职责: 定义服务层错误类型，转换Repository错误为可归类的业务错误
// 约定: 每个公开操作都以 "in <operation>: <cause>" 包装错误
// ==========================================

use crate::engine::validation::Violation;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 错误大类
///
/// 控制器按大类映射 HTTP 状态码（400/404/409/500），核心层不做映射。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Validation,
    NotFound,
    Conflict,
    Storage,
}

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    /// 结构校验失败（包含全部违规项）
    #[error("validation failed: {}", join(violations))]
    ValidationError { violations: Vec<Violation> },

    /// 完成条件不满足（包含全部原因）
    #[error("bagrut is not ready for completion: {}", reasons.join("; "))]
    CompletionNotReady { reasons: Vec<String> },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("storage error: {0}")]
    StorageError(String),

    // ==========================================
    // 操作名包装
    // ==========================================
    #[error("in {operation}: {source}")]
    InOperation {
        operation: &'static str,
        #[source]
        source: Box<ApiError>,
    },
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    /// 错误大类（穿透操作名包装）
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::ValidationError { .. }
            | ApiError::CompletionNotReady { .. }
            | ApiError::InvalidInput(_) => ApiErrorKind::Validation,
            ApiError::NotFound(_) => ApiErrorKind::NotFound,
            ApiError::Conflict(_) => ApiErrorKind::Conflict,
            ApiError::StorageError(_) => ApiErrorKind::Storage,
            ApiError::InOperation { source, .. } => source.kind(),
        }
    }

    /// 最外层操作名
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            ApiError::InOperation { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// 去除操作名包装后的根错误
    pub fn root(&self) -> &ApiError {
        match self {
            ApiError::InOperation { source, .. } => source.root(),
            other => other,
        }
    }

    /// 校验违规项（非校验错误返回空）
    pub fn violations(&self) -> &[Violation] {
        match self.root() {
            ApiError::ValidationError { violations } => violations,
            _ => &[],
        }
    }

    /// 以操作名包装；已包装的错误不重复包装
    pub fn in_operation(self, operation: &'static str) -> ApiError {
        match self {
            wrapped @ ApiError::InOperation { .. } => wrapped,
            other => ApiError::InOperation {
                operation,
                source: Box::new(other),
            },
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} with id={}", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::Conflict(msg),
            other => ApiError::StorageError(other.to_string()),
        }
    }
}

impl From<Vec<Violation>> for ApiError {
    fn from(violations: Vec<Violation>) -> Self {
        ApiError::ValidationError { violations }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

/// 为 Result 附加操作名
pub trait OperationContext<T> {
    fn in_operation(self, operation: &'static str) -> ApiResult<T>;
}

impl<T, E> OperationContext<T> for Result<T, E>
where
    E: Into<ApiError>,
{
    fn in_operation(self, operation: &'static str) -> ApiResult<T> {
        self.map_err(|e| e.into().in_operation(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::NotFound {
            entity: "bagrut".to_string(),
            id: "B1".to_string(),
        }
        .into();
        assert_eq!(api_err.kind(), ApiErrorKind::NotFound);
        assert!(api_err.to_string().contains("B1"));

        let api_err: ApiError = RepositoryError::UniqueConstraintViolation("dup".to_string()).into();
        assert_eq!(api_err.kind(), ApiErrorKind::Conflict);

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert_eq!(api_err.kind(), ApiErrorKind::Storage);
        assert!(api_err.to_string().contains("poisoned"));
    }

    #[test]
    fn test_operation_prefix_and_kind_passthrough() {
        let result: Result<(), RepositoryError> = Err(RepositoryError::DatabaseQueryError("disk I/O".to_string()));
        let err = result.in_operation("add_bagrut").unwrap_err();

        assert_eq!(err.to_string(), "in add_bagrut: storage error: database query failed: disk I/O");
        assert_eq!(err.kind(), ApiErrorKind::Storage);
        assert_eq!(err.operation(), Some("add_bagrut"));
    }

    #[test]
    fn test_no_double_wrapping() {
        let err = ApiError::NotFound("x".to_string())
            .in_operation("get_bagrut_by_id")
            .in_operation("update_bagrut");
        assert_eq!(err.operation(), Some("get_bagrut_by_id"));
    }

    #[test]
    fn test_validation_error_lists_all_violations() {
        let err: ApiError = vec![
            Violation::new("studentId", "is required"),
            Violation::new("teacherId", "is required"),
        ]
        .into();
        let msg = err.to_string();
        assert!(msg.contains("studentId: is required"));
        assert!(msg.contains("teacherId: is required"));
        assert_eq!(err.violations().len(), 2);
        assert_eq!(err.kind(), ApiErrorKind::Validation);
    }
}
