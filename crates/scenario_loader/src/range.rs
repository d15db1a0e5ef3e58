//! 行选择
//!
//! `start_row` 从 1 开始，`end_row` 包含在内；`-1` 表示直到最后一行。

use std::ops::Range;

use tracing::error;

use crate::error::{Result, ScenarioError};

/// 选中的行区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start_row: usize,
    pub end_row: i64,
}

impl Default for RowRange {
    fn default() -> Self {
        Self {
            start_row: 1,
            end_row: -1,
        }
    }
}

impl RowRange {
    pub fn new(start_row: usize, end_row: i64) -> Self {
        Self { start_row, end_row }
    }

    /// 转换为 0 起始的半开区间
    ///
    /// `end_row` 超出表长时记录错误并按 `-1` 处理。
    pub fn resolve(&self, total: usize) -> Result<Range<usize>> {
        if self.start_row < 1 || self.start_row > total {
            return Err(ScenarioError::RowRange(format!(
                "start_row {} outside 1..={total}",
                self.start_row
            )));
        }

        let end = match self.end_row {
            -1 => total,
            n if n > total as i64 => {
                error!(end_row = n, rows = total, "end_row exceeds table length, using -1");
                total
            }
            n if n < self.start_row as i64 => {
                return Err(ScenarioError::RowRange(format!(
                    "end_row {n} before start_row {}",
                    self.start_row
                )));
            }
            n => n as usize,
        };

        Ok(self.start_row - 1..end)
    }
}
