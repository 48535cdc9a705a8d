// パイプライン層 - エンジンの並行処理方式を組み合わせた具体的なパイプライン

pub mod hash;
pub mod spam;

pub use spam::SpamServices;
