use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// ファイルパスからBufReaderを作成する
/// パースやデータ変換は呼び出し側で行う
pub fn load_file<P: AsRef<Path>>(file_path: P) -> Result<BufReader<File>> {
    let path = file_path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("ファイルの読み込みに失敗しました: {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// YAMLファイルからSerdeでDeserializeできる型を読み込む
pub fn load_yaml_from_file<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T> {
    let path = file_path.as_ref();
    let buf_reader = load_file(path)?;
    serde_yaml::from_reader(buf_reader)
        .with_context(|| format!("YAMLファイルの解析に失敗: {}", path.display()))
}
