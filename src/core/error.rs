// パイプライン用のカスタムエラー型定義
// 構築時エラー（致命的）とアイテム単位エラー（回復可能）を区別する

use thiserror::Error;

/// パイプライン固有のエラー型
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("設定エラー: {message}")]
    Configuration { message: String },

    #[error("バリデーションエラー: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("ステージエラー: {stage} - {message}")]
    Stage { stage: String, message: String },

    #[error("外部サービスエラー: {operation} - {source}")]
    Collaborator {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("タスクエラー: {source}")]
    Task {
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("内部エラー: {source}")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// 設定エラーの作成
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// バリデーションエラーの作成
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// ステージエラーの作成
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// 外部サービスエラーの作成
    pub fn collaborator(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Collaborator {
            operation: operation.into(),
            source,
        }
    }

    /// タスクエラーの作成
    pub fn task(source: tokio::task::JoinError) -> Self {
        Self::Task { source }
    }

    /// 内部エラーの作成
    pub fn internal(source: anyhow::Error) -> Self {
        Self::Internal { source }
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Configuration { .. } | Self::Validation { .. } => ErrorSeverity::High,
            Self::Collaborator { .. } => ErrorSeverity::Low,
            Self::Stage { .. } | Self::Task { .. } => ErrorSeverity::Medium,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    /// エラーが回復可能かどうかを判定
    ///
    /// 構築時のエラーは実行前に報告されるため回復不能として扱う
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Configuration { .. } | Self::Validation { .. } => false,
            Self::Collaborator { .. } | Self::Stage { .. } | Self::Task { .. } => true,
            Self::Internal { .. } => false,
        }
    }

    /// エラーコンテキストを取得
    pub fn context(&self) -> ErrorContext {
        match self {
            Self::Configuration { message } => ErrorContext::new("configuration")
                .with_suggestion(format!("設定を確認してください: {message}")),
            Self::Validation { field, .. } => ErrorContext::new("validation")
                .with_resource(field.clone())
                .with_suggestion("1以上の値を指定してください"),
            Self::Stage { stage, .. } => ErrorContext::new("stage_execution")
                .with_resource(stage.clone()),
            Self::Collaborator { operation, .. } => ErrorContext::new("collaborator_call")
                .with_resource(operation.clone())
                .with_suggestion("該当アイテムは破棄されました"),
            _ => ErrorContext::new("unknown"),
        }
    }
}

/// エラーの重要度レベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 低重要度 - ログ出力程度
    Low,
    /// 中重要度 - 警告レベル
    Medium,
    /// 高重要度 - 要対応
    High,
    /// 致命的
    Critical,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// エラーコンテキスト情報
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// 実行していた操作
    pub operation: String,
    /// 関連するリソース（ステージ名、フィールド名等）
    pub resource: Option<String>,
    /// エラー解決のための提案
    pub suggestion: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            resource: None,
            suggestion: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// パイプラインの結果型
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
