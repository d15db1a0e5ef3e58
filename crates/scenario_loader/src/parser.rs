//! 参数表解析
//!
//! 表头定义列名；空白单元格继承上一行同列的值 (forward fill)。

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use contracts::ScenarioParams;

use crate::error::{Result, ScenarioError};

/// 解析 CSV 内容为场景行 (未校验)
///
/// 行号从 1 开始，不含表头。
pub fn parse<R: Read>(reader: R) -> Result<Vec<ScenarioParams>> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    check_headers(&headers)?;

    let mut rows = Vec::new();
    let mut previous: Option<StringRecord> = None;

    for (idx, record) in csv_reader.records().enumerate() {
        let row = idx + 1;
        let record = forward_fill(&record?, previous.as_ref());

        let params: ScenarioParams =
            record
                .deserialize(Some(&headers))
                .map_err(|e| ScenarioError::Parse {
                    row,
                    message: e.to_string(),
                })?;

        rows.push(params);
        previous = Some(record);
    }

    Ok(rows)
}

/// 用上一行填充空白单元格
pub fn forward_fill(record: &StringRecord, previous: Option<&StringRecord>) -> StringRecord {
    record
        .iter()
        .enumerate()
        .map(|(col, cell)| match previous {
            Some(prev) if cell.is_empty() => prev.get(col).unwrap_or(""),
            _ => cell,
        })
        .collect()
}

/// 表头必须包含全部列
fn check_headers(headers: &StringRecord) -> Result<()> {
    let missing: Vec<&str> = ScenarioParams::COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ScenarioError::Parse {
            row: 0,
            message: format!("missing columns: {}", missing.join(", ")),
        })
    }
}
