//! Errors - エラーの運用分類
//!
//! 具体的なエラー型は `crate::error::MigrateError` にあり、
//! ここでは「止めるか・続けるか」を決めるための分類だけを定義します。

/// ErrorKind は実行エラーの分類
///
/// - Configuration: 設定・不変条件の違反（即中断）
/// - Transient: 単一 blob のコピー開始失敗など（記録して続行）
/// - Infrastructure: ファイルシステム・ネットワーク・認証の障害（中断）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transient,
    Infrastructure,
}

impl ErrorKind {
    /// Whether a failure of this kind stops the pipeline.
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorKind::Transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_survivable() {
        assert!(ErrorKind::Configuration.is_fatal());
        assert!(ErrorKind::Infrastructure.is_fatal());
        assert!(!ErrorKind::Transient.is_fatal());
    }
}
