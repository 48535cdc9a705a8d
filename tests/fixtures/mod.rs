// 統合テスト用のヘルパー
// 同時実行数の計測器とメールボックスのフィクスチャ

pub mod gauges;
pub mod test_data;

// 公開API
pub use gauges::*;
pub use test_data::*;
