//! TOML 配置加载

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// 从 TOML 文件加载配置
pub fn load_toml<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("读取配置文件失败: {:?}", path))?;
    parse_toml(&content).with_context(|| format!("解析 TOML 配置失败: {:?}", path))
}

/// 从 TOML 文本解析配置
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> anyhow::Result<T> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    fn test_load_toml_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"gbuffer\"\ncount = 3").unwrap();

        let sample: Sample = load_toml(file.path()).unwrap();
        assert_eq!(sample, Sample { name: "gbuffer".to_string(), count: 3 });
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_toml::<Sample, _>("/definitely/not/here.toml").unwrap_err();
        assert!(format!("{err:#}").contains("here.toml"));
    }

    #[test]
    fn test_parse_toml_default_field() {
        let sample: Sample = parse_toml("name = \"x\"").unwrap();
        assert_eq!(sample.count, 0);
    }
}
